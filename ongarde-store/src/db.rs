//! Shared SQLite pool setup for the key store and audit sink: one embedded
//! database, opened once at startup, WAL mode for concurrent dashboard
//! reads alongside the audit writer.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub async fn open(path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS keys (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            secret_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_used_at TEXT,
            revoked_at TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS audit_events (
            scan_id TEXT PRIMARY KEY,
            ts TEXT NOT NULL,
            kind TEXT NOT NULL,
            decision TEXT NOT NULL,
            rule_id TEXT,
            risk_level TEXT,
            excerpt TEXT,
            source_key_id TEXT,
            upstream_target TEXT,
            was_streaming INTEGER NOT NULL,
            tokens_delivered INTEGER,
            test INTEGER NOT NULL,
            suppressed_by_allowlist INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
