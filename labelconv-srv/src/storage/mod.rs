//! Object storage abstraction
//!
//! The lifecycle core only needs five primitives: write, read, head, list
//! and (for external tooling and tests) delete. Backends implement the
//! `ObjectStore` trait; the service injects one `Arc<dyn ObjectStore>` at
//! startup instead of sharing a process-wide client.

use std::time::Duration;

use async_trait::async_trait;
use labelconv_common::Result;
use tracing::warn;

pub mod fs;
pub mod layout;

pub use fs::FsObjectStore;

/// Information about a stored object from head/list operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// `/`-separated object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Content type, if the backend can determine one
    pub content_type: Option<String>,
}

impl ObjectInfo {
    /// Final path segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Low-level object storage operations
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object, overwriting any existing object at the key.
    ///
    /// `content_type` is advisory; backends without content-type metadata
    /// (the filesystem) derive it from the key on read instead.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Read an object's bytes
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Object metadata, or None if the object does not exist
    async fn head(&self, key: &str) -> Result<Option<ObjectInfo>>;

    /// Check object existence
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.head(key).await?.is_some())
    }

    /// List all objects whose key starts with the prefix.
    ///
    /// A missing prefix yields an empty listing, never an error.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Delete an object. Not used by the lifecycle core; deleting a
    /// missing object is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Bounded retry for transient storage failures.
///
/// `attempts` counts total tries, so 1 disables retrying. The delay
/// doubles after each failed attempt. Non-transient errors surface
/// immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Run an operation, retrying transient failures up to the attempt budget
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    warn!(
                        "Storage operation failed (attempt {attempt}/{}): {e}",
                        self.attempts
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Content type derived from a key's extension.
///
/// Filesystem-backed storage has nowhere to persist the declared type, so
/// reads fall back to this mapping.
pub fn content_type_for_key(key: &str) -> Option<String> {
    let ext = key.rsplit('.').next()?;
    let content_type = match ext.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(content_type.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(
            content_type_for_key("a_b.com/REQ-1_request.txt").as_deref(),
            Some("text/plain")
        );
        assert_eq!(
            content_type_for_key("a_b.com/converted_files/out.PDF").as_deref(),
            Some("application/pdf")
        );
        assert_eq!(content_type_for_key("a_b.com/uploaded_files/label.btw"), None);
    }

    #[test]
    fn file_name_is_last_segment() {
        let info = ObjectInfo {
            key: "a_b.com/uploaded_files/f1.png".to_string(),
            size: 10,
            content_type: None,
        };
        assert_eq!(info.file_name(), "f1.png");
    }
}
