//! Applies module migrations once each, recording them in a ledger table.

use anyhow::Context;
use libris_kernel::Migration;
use sqlx::SqlitePool;
use time::OffsetDateTime;

const LEDGER_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS _libris_migrations (
    module     TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (module, id)
);
"#;

/// Apply every migration not yet in the ledger, each in its own transaction.
/// Returns the number applied.
pub async fn run_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::raw_sql(LEDGER_DDL)
        .execute(pool)
        .await
        .context("failed to create migration ledger")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let mut tx = pool.begin().await.context("failed to open transaction")?;

        let already: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM _libris_migrations WHERE module = ? AND id = ?")
                .bind(module.as_str())
                .bind(migration.id)
                .fetch_optional(&mut *tx)
                .await
                .context("failed to read migration ledger")?;

        if already.is_some() {
            tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

        sqlx::query("INSERT INTO _libris_migrations (module, id, applied_at) VALUES (?, ?, ?)")
            .bind(module.as_str())
            .bind(migration.id)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await
            .context("failed to record migration")?;

        tx.commit()
            .await
            .with_context(|| format!("failed to commit migration {}/{}", module, migration.id))?;

        tracing::info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
