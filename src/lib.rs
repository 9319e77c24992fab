//! Libris application library: the `books` module and process bootstrap.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::Application;
