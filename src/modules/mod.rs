pub mod books;

use std::sync::Arc;

use libris_kernel::ModuleRegistry;

use books::BookStore;

/// Register every feature module with the registry.
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<dyn BookStore>) {
    registry.register_custom(books::create_module(store));
}
