//! Request identifier allocation
//!
//! A single-row counter table backs the human-readable `REQ-<n>` scheme.
//! The read-increment-persist cycle runs inside one transaction so
//! concurrent submissions can never observe or hand out the same value.

use labelconv_common::{Error, Result};
use sqlx::SqlitePool;

/// Allocate the next request identifier.
///
/// Seeds the counter row lazily on first use. The increment commits
/// before the identifier is returned; a committed value is never reused.
pub async fn allocate(pool: &SqlitePool) -> Result<String> {
    let mut tx = pool.begin().await.map_err(unavailable)?;

    sqlx::query("INSERT OR IGNORE INTO request_counter (id, counter) VALUES (1, 0)")
        .execute(&mut *tx)
        .await?;

    let counter: i64 = sqlx::query_scalar(
        "UPDATE request_counter SET counter = counter + 1 WHERE id = 1 RETURNING counter",
    )
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(format!("REQ-{counter}"))
}

/// Classify connection-level failures as the backing store being
/// unreachable, distinct from query errors.
fn unavailable(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            Error::StorageUnavailable(format!("database unreachable: {e}"))
        }
        other => Error::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelconv_common::db::init_database;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("labelconv.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn identifiers_are_sequential_from_one() {
        let (_dir, pool) = test_pool().await;
        assert_eq!(allocate(&pool).await.unwrap(), "REQ-1");
        assert_eq!(allocate(&pool).await.unwrap(), "REQ-2");
        assert_eq!(allocate(&pool).await.unwrap(), "REQ-3");
    }

    #[tokio::test]
    async fn concurrent_allocations_never_collide() {
        let (_dir, pool) = test_pool().await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { allocate(&pool).await }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }

        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len(), "duplicate identifiers: {ids:?}");

        // Counter ends exactly at the number of allocations
        let counter: i64 = sqlx::query_scalar("SELECT counter FROM request_counter WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(counter, 20);
    }
}
