//! Database initialization
//!
//! Creates the queue database on first run and opens it with WAL and a busy
//! timeout so the foreground pipeline and the background retry loop can
//! share it without lost updates.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

use crate::Result;

/// Open (creating if needed) the queue database at `db_path`.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new().max_connections(5).connect(&db_url).await?;

    if newly_created {
        info!("Initialized new queue database: {}", db_path.display());
    } else {
        info!("Opened existing queue database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create queue tables (idempotent; also used by tests on in-memory pools).
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_pending_transmissions_table(pool).await?;
    create_expired_transmissions_table(pool).await?;
    Ok(())
}

async fn create_pending_transmissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_transmissions (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL CHECK (kind IN ('attendance', 'device')),
            payload TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'delivered', 'expired')),
            enqueued_at TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK (attempts >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pending_transmissions_status ON pending_transmissions(status, enqueued_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_expired_transmissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expired_transmissions (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            attempts INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'expired',
            enqueued_at TEXT NOT NULL,
            expired_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
