use async_trait::async_trait;
use axum::Router;

/// Context handed to modules during init and start.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// A schema change contributed by a module. `id` must be unique within the
/// module and sorts in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A unit of functionality plugged into the Libris kernel.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name; also the mount path segment for the module's routes.
    fn name(&self) -> &'static str;

    /// Called during startup, before migrations are applied.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes mounted under `{api_prefix}/{name}`.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components.schemas`) merged into the
    /// service document.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called once migrations are complete.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during shutdown, in reverse start order.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
