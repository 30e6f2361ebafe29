//! Read-time reconciliation
//!
//! Object storage mutates outside the service's control: an external
//! process deposits converted output, and operators add or remove files
//! directly. Every read therefore recomputes the relational status from a
//! fresh listing, and a record whose folder has vanished is deleted on
//! the spot. The procedure is idempotent and bidirectional, so it is safe
//! to run on every page load and concurrently for the same folder.

use labelconv_common::db::{ConversionRequest, RequestStatus};
use labelconv_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::requests;
use crate::storage::{layout, ObjectInfo, ObjectStore};

/// A classified file under a request folder
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub full_path: String,
    pub size: u64,
    pub content_type: Option<String>,
}

/// Reconciled view of a request: the (possibly repaired) record plus the
/// classified folder contents
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRequest {
    #[serde(flatten)]
    pub record: ConversionRequest,
    pub uploaded_files: Vec<FileInfo>,
    pub converted_files: Vec<FileInfo>,
}

/// Look up the request for an email and reconcile its status against the
/// actual folder contents. `None` means no record, or a record whose
/// folder vanished (deleted here); callers report both identically.
pub async fn resolve(
    pool: &SqlitePool,
    store: &dyn ObjectStore,
    email: &str,
) -> Result<Option<ResolvedRequest>> {
    let Some(mut record) = requests::find_by_email(pool, email).await? else {
        return Ok(None);
    };

    let listing = store.list(&record.folder_name).await.map_err(|e| match e {
        Error::StorageUnavailable(_) => e,
        other => Error::StorageUnavailable(other.to_string()),
    })?;

    // Object storage is the source of truth for existence: an empty
    // listing means the folder was deleted out from under the record.
    if listing.is_empty() {
        warn!(
            "Folder {} is gone; removing orphaned record {}",
            record.folder_name, record.id
        );
        requests::delete_by_id(pool, &record.id).await?;
        return Ok(None);
    }

    let (uploaded_files, converted_files) = classify(&listing);

    let has_output = !converted_files.is_empty();
    if let Some(new_status) = next_status(record.status, has_output) {
        info!(
            "Request {}: status {} -> {} ({} converted file(s))",
            record.id,
            RequestStatus::label_for(record.status),
            RequestStatus::label_for(new_status.code()),
            converted_files.len()
        );
        // Unconditional set: concurrent reconcilers recompute the same
        // value from the same snapshot, so last-writer-wins is safe.
        requests::update_status(pool, &record.id, new_status.code()).await?;
        record.status = new_status.code();
    }

    Ok(Some(ResolvedRequest {
        record,
        uploaded_files,
        converted_files,
    }))
}

/// Split a folder listing into uploaded and converted files.
///
/// The placeholder and the manifest never count; objects matching neither
/// subfolder pattern are ignored.
pub fn classify(objects: &[ObjectInfo]) -> (Vec<FileInfo>, Vec<FileInfo>) {
    let uploaded_marker = format!("/{}/", layout::UPLOADED_DIR);
    let converted_marker = format!("/{}/", layout::CONVERTED_DIR);

    let mut uploaded = Vec::new();
    let mut converted = Vec::new();

    for object in objects {
        let name = object.file_name();
        if name == layout::PLACEHOLDER_NAME || name.ends_with(layout::MANIFEST_SUFFIX) {
            continue;
        }

        let info = FileInfo {
            name: name.to_string(),
            full_path: object.key.clone(),
            size: object.size,
            content_type: object.content_type.clone(),
        };

        if object.key.contains(&uploaded_marker) {
            uploaded.push(info);
        } else if object.key.contains(&converted_marker) {
            converted.push(info);
        }
    }

    (uploaded, converted)
}

/// Status transition rule: a total, idempotent function of the current
/// status and whether converted output exists. `None` means no write is
/// needed.
pub fn next_status(current: i64, has_output: bool) -> Option<RequestStatus> {
    let completed = RequestStatus::Completed.code();
    if has_output && current != completed {
        Some(RequestStatus::Completed)
    } else if !has_output && current == completed {
        Some(RequestStatus::Processing)
    } else {
        None
    }
}
