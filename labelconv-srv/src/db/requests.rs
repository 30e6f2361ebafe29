//! Conversion request persistence
//!
//! The record is created once by the upload orchestrator and afterwards
//! touched only by reconciliation (status updates, orphan deletion).

use chrono::{DateTime, Utc};
use labelconv_common::db::ConversionRequest;
use labelconv_common::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Insert a new request record.
///
/// The UNIQUE constraint on contact_mail backstops the admission check;
/// losing that race surfaces as a unique violation the caller maps to a
/// conflict.
pub async fn insert(pool: &SqlitePool, request: &ConversionRequest) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversion_requests (
            id, contact_name, contact_mail, contact_phone,
            label_software, other_software_name, other_software_website,
            num_labels, conversion_fonts, conversion_fieldnames,
            comparison_print_scan, support_ads,
            status, created_at, folder_name, manifest_object
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&request.id)
    .bind(&request.contact_name)
    .bind(&request.contact_mail)
    .bind(&request.contact_phone)
    .bind(&request.label_software)
    .bind(&request.other_software_name)
    .bind(&request.other_software_website)
    .bind(request.num_labels)
    .bind(request.conversion_fonts as i64)
    .bind(request.conversion_fieldnames as i64)
    .bind(request.comparison_print_scan as i64)
    .bind(request.support_ads as i64)
    .bind(request.status)
    .bind(request.created_at.to_rfc3339())
    .bind(&request.folder_name)
    .bind(&request.manifest_object)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a request record by contact email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<ConversionRequest>> {
    let row = sqlx::query(
        r#"
        SELECT id, contact_name, contact_mail, contact_phone,
               label_software, other_software_name, other_software_website,
               num_labels, conversion_fonts, conversion_fieldnames,
               comparison_print_scan, support_ads,
               status, created_at, folder_name, manifest_object
        FROM conversion_requests
        WHERE contact_mail = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_request).transpose()
}

/// Unconditionally set a request's status (last-writer-wins; every
/// reconciler recomputes the same value from the same storage snapshot)
pub async fn update_status(pool: &SqlitePool, id: &str, status: i64) -> Result<()> {
    sqlx::query("UPDATE conversion_requests SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a request record (orphan healing)
pub async fn delete_by_id(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM conversion_requests WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// True when an error is the email UNIQUE constraint firing
pub fn is_unique_violation(error: &Error) -> bool {
    match error {
        Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

fn row_to_request(row: sqlx::sqlite::SqliteRow) -> Result<ConversionRequest> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| Error::Database(sqlx::Error::Decode(Box::new(e))))?
        .with_timezone(&Utc);

    Ok(ConversionRequest {
        id: row.get("id"),
        contact_name: row.get("contact_name"),
        contact_mail: row.get("contact_mail"),
        contact_phone: row.get("contact_phone"),
        label_software: row.get("label_software"),
        other_software_name: row.get("other_software_name"),
        other_software_website: row.get("other_software_website"),
        num_labels: row.get("num_labels"),
        conversion_fonts: row.get::<i64, _>("conversion_fonts") != 0,
        conversion_fieldnames: row.get::<i64, _>("conversion_fieldnames") != 0,
        comparison_print_scan: row.get::<i64, _>("comparison_print_scan") != 0,
        support_ads: row.get::<i64, _>("support_ads") != 0,
        status: row.get("status"),
        created_at,
        folder_name: row.get("folder_name"),
        manifest_object: row.get("manifest_object"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelconv_common::db::{init_database, RequestStatus};

    fn sample_request(id: &str, email: &str) -> ConversionRequest {
        ConversionRequest {
            id: id.to_string(),
            contact_name: "Alice Example".to_string(),
            contact_mail: email.to_string(),
            contact_phone: Some("+49 30 1234".to_string()),
            label_software: "bartender".to_string(),
            other_software_name: None,
            other_software_website: None,
            num_labels: 3,
            conversion_fonts: true,
            conversion_fieldnames: false,
            comparison_print_scan: false,
            support_ads: true,
            status: RequestStatus::Processing.code(),
            created_at: Utc::now(),
            folder_name: "alice@example.com".to_string(),
            manifest_object: "alice@example.com/REQ-1_request.txt".to_string(),
        }
    }

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("labelconv.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let (_dir, pool) = test_pool().await;
        let request = sample_request("REQ-1", "alice@example.com");
        insert(&pool, &request).await.unwrap();

        let loaded = find_by_email(&pool, "alice@example.com")
            .await
            .unwrap()
            .expect("record should exist");
        assert_eq!(loaded.id, "REQ-1");
        assert_eq!(loaded.contact_name, "Alice Example");
        assert_eq!(loaded.num_labels, 3);
        assert!(loaded.conversion_fonts);
        assert!(!loaded.conversion_fieldnames);
        assert_eq!(loaded.status, 50);
        assert_eq!(loaded.folder_name, "alice@example.com");

        assert!(find_by_email(&pool, "bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let (_dir, pool) = test_pool().await;
        insert(&pool, &sample_request("REQ-1", "alice@example.com")).await.unwrap();

        let err = insert(&pool, &sample_request("REQ-2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err), "got {err:?}");
    }

    #[tokio::test]
    async fn status_update_and_delete() {
        let (_dir, pool) = test_pool().await;
        insert(&pool, &sample_request("REQ-1", "alice@example.com")).await.unwrap();

        update_status(&pool, "REQ-1", RequestStatus::Completed.code()).await.unwrap();
        let loaded = find_by_email(&pool, "alice@example.com").await.unwrap().unwrap();
        assert_eq!(loaded.status, 100);

        delete_by_id(&pool, "REQ-1").await.unwrap();
        assert!(find_by_email(&pool, "alice@example.com").await.unwrap().is_none());
    }
}
