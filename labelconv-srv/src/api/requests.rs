//! Submission and request-read endpoints
//!
//! The upload endpoint does all metadata/file validation before the core
//! is touched, so a rejected submission never allocates an identifier or
//! writes an object.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use labelconv_common::Error;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::reconcile::{self, ResolvedRequest};
use crate::submission::{self, SubmissionForm, SubmissionReceipt, UploadedFile};
use crate::AppState;

/// Multipart part carrying the JSON submission form
const REQUEST_PART: &str = "request";

/// Multipart parts carrying the example files
const FILES_PART: &str = "exampleFiles";

/// POST /api/requests
///
/// Multipart body: one `request` part (JSON form) plus 1..=max
/// `exampleFiles` parts. Responds 201 with the request id and folder,
/// or 409 with the existing request id for a duplicate email.
pub async fn submit_request(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmissionReceipt>)> {
    let mut form: Option<SubmissionForm> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let part_name = field.name().map(str::to_string);
        match part_name.as_deref() {
            Some(REQUEST_PART) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable request part: {e}")))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid request JSON: {e}")))?;
                form = Some(parsed);
            }
            Some(FILES_PART) => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable file part: {e}")))?;
                files.push(UploadedFile {
                    name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            // Unknown parts are ignored rather than rejected
            _ => {}
        }
    }

    let form = form
        .ok_or_else(|| ApiError::BadRequest("Missing request metadata part".to_string()))?;
    validate_submission(&form, &files, state.max_upload_files)?;

    info!(
        "Submission from {} with {} file(s)",
        form.contact_mail,
        files.len()
    );

    let receipt = submission::submit(&state.db, state.store.as_ref(), state.retry, form, files)
        .await
        .map_err(|e| match e {
            Error::Conflict { existing_id } => ApiError::Conflict { existing_id },
            other => ApiError::Common(other),
        })?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/requests/:email
///
/// Reconciliation read: returns the request record for the email along
/// with the classified folder contents. A missing record and a healed
/// orphan are both 404.
pub async fn get_request(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<ResolvedRequest>> {
    let resolved = reconcile::resolve(&state.db, state.store.as_ref(), &email)
        .await
        .map_err(ApiError::Common)?;

    match resolved {
        Some(resolved) => Ok(Json(resolved)),
        None => Err(ApiError::NotFound(format!(
            "No request found for email: {email}"
        ))),
    }
}

/// Reject a submission before any identifier allocation or storage write
fn validate_submission(
    form: &SubmissionForm,
    files: &[UploadedFile],
    max_files: usize,
) -> ApiResult<()> {
    if form.contact_name.trim().is_empty() {
        return Err(ApiError::BadRequest("contactName is required".to_string()));
    }
    let mail = form.contact_mail.trim();
    if mail.is_empty() {
        return Err(ApiError::BadRequest("contactMail is required".to_string()));
    }
    if !mail.contains('@') || mail.contains(char::is_whitespace) {
        return Err(ApiError::BadRequest(format!(
            "contactMail is not a valid email address: {mail}"
        )));
    }
    if form.num_labels < 1 {
        return Err(ApiError::BadRequest(
            "numLabels must be at least 1".to_string(),
        ));
    }
    if form.label_software.trim().is_empty() {
        return Err(ApiError::BadRequest("labelSoftware is required".to_string()));
    }
    if files.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one example file is required".to_string(),
        ));
    }
    if files.len() > max_files {
        return Err(ApiError::BadRequest(format!(
            "At most {max_files} example files are accepted, got {}",
            files.len()
        )));
    }
    for file in files {
        if file.name.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Every example file needs a filename".to_string(),
            ));
        }
        if file.name.contains('/') || file.name.contains('\\') || file.name == ".." {
            return Err(ApiError::BadRequest(format!(
                "Invalid filename: {}",
                file.name
            )));
        }
    }

    Ok(())
}
