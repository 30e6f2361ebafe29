//! Database initialization
//!
//! Creates the database file on first run and brings the schema up
//! idempotently, so every startup path is safe to repeat.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Connection options apply to every pooled connection. WAL allows
    // concurrent readers while a reconciliation write is in flight; the
    // busy timeout serializes concurrent counter increments instead of
    // surfacing SQLITE_BUSY to callers.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Migrations (idempotent - safe to call multiple times)
    create_requests_table(&pool).await?;
    create_request_counter_table(&pool).await?;

    Ok(pool)
}

/// Create the conversion_requests table
///
/// The UNIQUE constraint on contact_mail is the authoritative duplicate
/// guard; the pre-insert admission check is only a fast path.
async fn create_requests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversion_requests (
            id TEXT PRIMARY KEY,
            contact_name TEXT NOT NULL,
            contact_mail TEXT NOT NULL UNIQUE,
            contact_phone TEXT,
            label_software TEXT NOT NULL,
            other_software_name TEXT,
            other_software_website TEXT,
            num_labels INTEGER NOT NULL,
            conversion_fonts INTEGER NOT NULL DEFAULT 0,
            conversion_fieldnames INTEGER NOT NULL DEFAULT 0,
            comparison_print_scan INTEGER NOT NULL DEFAULT 0,
            support_ads INTEGER NOT NULL DEFAULT 0,
            status INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            folder_name TEXT NOT NULL,
            manifest_object TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the single-row request_counter table
///
/// The row is seeded lazily by the first allocation.
async fn create_request_counter_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS request_counter (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            counter INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
