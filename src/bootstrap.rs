//! Process wiring: pick the record store, register modules, and drive the
//! kernel lifecycle around the HTTP server.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use libris_db::DbModule;
use libris_kernel::settings::StorageBackend;
use libris_kernel::{InitCtx, ModuleRegistry, Settings};
use sqlx::SqlitePool;

use crate::modules::{self, books::BookStore, books::MemoryBookStore, books::SqliteBookStore};

pub struct Application {
    settings: Settings,
    registry: ModuleRegistry,
    pool: Option<SqlitePool>,
}

impl Application {
    /// Open the configured store and register every module. Nothing is
    /// initialized yet.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();

        let (store, pool): (Arc<dyn BookStore>, Option<SqlitePool>) =
            match settings.database.backend {
                StorageBackend::Memory => (Arc::new(MemoryBookStore::new()), None),
                StorageBackend::Sqlite => {
                    let pool = libris_db::connect(&settings.database).await?;
                    registry.register_core(Arc::new(DbModule::new(pool.clone())));
                    (Arc::new(SqliteBookStore::new(pool.clone())), Some(pool))
                }
            };

        tracing::info!(backend = store.backend(), "record store selected");
        modules::register_all(&mut registry, store);

        Ok(Self {
            settings,
            registry,
            pool,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn router(&self) -> Router {
        libris_http::build_router(&self.registry, &self.settings)
    }

    /// Apply pending module migrations. The memory store has no schema, so
    /// this is a no-op without a database pool.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let Some(pool) = &self.pool else {
            tracing::info!("memory backend selected; no migrations to apply");
            return Ok(0);
        };
        let migrations = self.registry.collect_migrations();
        libris_db::run_migrations(pool, &migrations)
            .await
            .context("failed to apply migrations")
    }

    /// Init every module, migrate, then start them.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.init_all(&ctx).await?;
        let applied = self.migrate().await?;
        tracing::info!(applied, "migrations complete");
        self.registry.start_all(&ctx).await
    }

    /// Serve until a shutdown signal, then stop modules in reverse order.
    pub async fn run(self) -> anyhow::Result<()> {
        self.prepare().await?;

        let served = libris_http::start_server(&self.registry, &self.settings).await;
        let stopped = self.registry.stop_all().await;

        served?;
        stopped
    }
}
