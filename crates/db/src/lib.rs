//! SQLite connection factory, migration runner and the `db` core module.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use libris_kernel::{settings::DatabaseSettings, InitCtx, Module};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub mod migrate;

pub use migrate::run_migrations;

/// How long a connection waits for another writer's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection pool for the configured database URL.
///
/// An in-memory database lives and dies with its connection, so such URLs get
/// a single connection that is never recycled. File databases use WAL so
/// readers do not block the writer.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let in_memory = settings.url.contains(":memory:") || settings.url.contains("mode=memory");

    let mut connect_options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .busy_timeout(BUSY_TIMEOUT);
    if !in_memory {
        connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
    }

    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections)
    };

    let pool = options
        .connect_with(connect_options)
        .await
        .with_context(|| format!("failed to connect to database '{}'", settings.url))?;

    tracing::info!(
        target: "libris-db",
        url = %settings.url,
        in_memory,
        "database pool ready"
    );

    Ok(pool)
}

/// Core module owning the pool's lifecycle.
pub struct DbModule {
    pool: SqlitePool,
}

impl DbModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        tracing::info!(module = self.name(), "database reachable");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        tracing::info!(module = self.name(), "database pool closed");
        Ok(())
    }
}
