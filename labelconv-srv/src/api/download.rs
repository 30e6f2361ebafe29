//! File download gateway
//!
//! Resolves a (folder, file, role) triple to a single object and returns
//! its bytes with the stored content type. Existence is verified before
//! the body is read, and both name arguments must be single path
//! segments.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::storage::layout;
use crate::AppState;

/// Query parameters for GET /api/download
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub folder: String,
    pub file: String,
    /// "uploaded" or "converted"
    #[serde(rename = "type")]
    pub role: String,
}

/// GET /api/download?folder=&file=&type=
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<impl IntoResponse> {
    validate_segment("folder", &query.folder)?;
    validate_segment("file", &query.file)?;

    let key = match query.role.as_str() {
        "uploaded" => layout::uploaded_key(&query.folder, &query.file),
        "converted" => layout::converted_key(&query.folder, &query.file),
        other => {
            return Err(ApiError::BadRequest(format!(
                "type must be 'uploaded' or 'converted', got '{other}'"
            )))
        }
    };

    debug!("Download requested: {key}");

    let info = state
        .store
        .head(&key)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::NotFound(format!("File not found: {key}")))?;

    let data = state.store.get(&key).await.map_err(ApiError::Common)?;

    let content_type = info
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(info.size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&query.file),
    );

    Ok((StatusCode::OK, headers, data))
}

/// Attachment header with an ASCII-safe fallback name and the RFC 5987
/// encoded original
fn content_disposition(filename: &str) -> HeaderValue {
    let plain = ascii_fallback(filename);
    let encoded = rfc5987_encode(filename);
    let value = format!("attachment; filename=\"{plain}\"; filename*=UTF-8''{encoded}");
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"download\""))
}

/// Replace everything outside `[A-Za-z0-9._-]` for the quoted filename
fn ascii_fallback(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// RFC 5987 ext-value encoding: unreserved characters pass through,
/// everything else becomes percent-encoded UTF-8 bytes
fn rfc5987_encode(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    for byte in filename.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Folder and file arguments must be single path segments
fn validate_segment(what: &str, value: &str) -> ApiResult<()> {
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{what} is required")));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(ApiError::BadRequest(format!("Invalid {what}: {value}")));
    }
    Ok(())
}
