//! Upload orchestration
//!
//! A submission becomes durable in two steps: first every object write
//! (manifest, each example file, converted-files placeholder) must
//! succeed, then the relational record is inserted. A partial folder is
//! never committed into the relational store. Failed submissions may
//! leave stray objects behind; those are harmless because orphan cleanup
//! only triggers from the relational side and no record was created.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use labelconv_common::db::{ConversionRequest, RequestStatus};
use labelconv_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{requests, sequence};
use crate::storage::{layout, ObjectStore, RetryPolicy};

/// Validated submission metadata, field names matching the client wire
/// format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionForm {
    pub contact_name: String,
    pub contact_mail: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub num_labels: i64,
    pub label_software: String,
    #[serde(default)]
    pub other_software_name: Option<String>,
    #[serde(default)]
    pub other_software_website: Option<String>,
    #[serde(default)]
    pub conversion_fonts: bool,
    #[serde(default)]
    pub conversion_fieldnames: bool,
    #[serde(default)]
    pub comparison_print_scan: bool,
    #[serde(default, rename = "supportADS")]
    pub support_ads: bool,
}

/// One example file from the submission
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename, preserved verbatim as the storage key segment
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Returned to the client on a successful submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(rename = "folderName")]
    pub folder_name: String,
}

/// Accept a submission: admission check, id allocation, object fan-out,
/// relational insert.
pub async fn submit(
    pool: &SqlitePool,
    store: &dyn ObjectStore,
    retry: RetryPolicy,
    form: SubmissionForm,
    files: Vec<UploadedFile>,
) -> Result<SubmissionReceipt> {
    // Fast-path duplicate check; the UNIQUE constraint below is the
    // authoritative guard for the race where two submissions pass this
    // point together.
    if let Some(existing) = requests::find_by_email(pool, &form.contact_mail).await? {
        info!(
            "Request already exists for {} (id: {})",
            form.contact_mail, existing.id
        );
        return Err(Error::Conflict {
            existing_id: existing.id,
        });
    }

    let id = sequence::allocate(pool).await?;
    let folder = layout::folder_of(&form.contact_mail);
    let manifest_key = layout::manifest_key(&folder, &id);
    let created_at = Utc::now();

    let manifest = manifest_content(&form, &id, &folder, created_at)?;

    // One write per object, issued concurrently and jointly awaited.
    let mut objects: Vec<(String, &[u8], &str)> = Vec::with_capacity(files.len() + 2);
    objects.push((manifest_key.clone(), manifest.as_slice(), "text/plain"));
    for file in &files {
        objects.push((
            layout::uploaded_key(&folder, &file.name),
            file.data.as_slice(),
            file.content_type.as_str(),
        ));
    }
    objects.push((layout::placeholder_key(&folder), &[], "text/plain"));

    let writes = objects
        .iter()
        .map(|(key, data, content_type)| retry.run(move || store.put(key, data, content_type)));

    try_join_all(writes)
        .await
        .map_err(|e| Error::StorageWrite(e.to_string()))?;

    info!(
        "✓ Request {id}: manifest and {} file(s) staged under {folder}",
        files.len()
    );

    let record = ConversionRequest {
        id: id.clone(),
        contact_name: form.contact_name,
        contact_mail: form.contact_mail.clone(),
        contact_phone: form.contact_phone,
        label_software: form.label_software,
        other_software_name: form.other_software_name,
        other_software_website: form.other_software_website,
        num_labels: form.num_labels,
        conversion_fonts: form.conversion_fonts,
        conversion_fieldnames: form.conversion_fieldnames,
        comparison_print_scan: form.comparison_print_scan,
        support_ads: form.support_ads,
        status: RequestStatus::Processing.code(),
        created_at,
        folder_name: folder.clone(),
        manifest_object: manifest_key,
    };

    if let Err(e) = requests::insert(pool, &record).await {
        if requests::is_unique_violation(&e) {
            // Lost the admission race; report the surviving record
            if let Some(existing) = requests::find_by_email(pool, &form.contact_mail).await? {
                return Err(Error::Conflict {
                    existing_id: existing.id,
                });
            }
        }
        return Err(e);
    }

    info!("✓ Request {id} recorded for {}", form.contact_mail);

    Ok(SubmissionReceipt {
        request_id: id,
        folder_name: folder,
    })
}

/// Manifest object content: the submitted metadata plus the allocated
/// identifier, pretty-printed for human readers
fn manifest_content(
    form: &SubmissionForm,
    id: &str,
    folder: &str,
    created_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let mut manifest = serde_json::to_value(form)?;
    manifest["ID"] = serde_json::Value::String(id.to_string());
    manifest["createdAt"] = serde_json::Value::String(created_at.to_rfc3339());
    manifest["folderName"] = serde_json::Value::String(folder.to_string());

    Ok(serde_json::to_vec_pretty(&manifest)?)
}
