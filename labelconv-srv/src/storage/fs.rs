//! Filesystem-backed object store
//!
//! Keys map to paths under a root directory. Folders have no independent
//! existence (matching object-store semantics): deleting the last object
//! under a prefix also prunes the now-empty directories, and listing a
//! missing prefix yields an empty result.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use labelconv_common::{Error, Result};
use tokio::fs;

use super::{content_type_for_key, ObjectInfo, ObjectStore};

/// Object store rooted at a local directory
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a key to a path under the root.
    ///
    /// Keys are `/`-separated; empty, `.` and `..` components are rejected
    /// so a stored filename can never escape the root.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(Error::InvalidInput("empty object key".to_string()));
        }
        let mut path = self.root.clone();
        for component in key.split('/') {
            if component.is_empty() || component == "." || component == ".." {
                return Err(Error::InvalidInput(format!("invalid object key: {key}")));
            }
            path.push(component);
        }
        Ok(path)
    }

    /// Remove empty parent directories left behind by delete, up to the root
    async fn prune_empty_parents(&self, mut path: PathBuf) {
        while path.pop() && path != self.root && path.starts_with(&self.root) {
            // remove_dir fails on non-empty directories, which ends the walk
            if fs::remove_dir(&path).await.is_err() {
                break;
            }
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::NotFound(format!("object not found: {key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectInfo>> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(ObjectInfo {
                key: key.to_string(),
                size: meta.len(),
                content_type: content_type_for_key(key),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let base = self.resolve(prefix)?;
        let meta = match fs::metadata(&base).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut results = Vec::new();

        if meta.is_file() {
            results.push(ObjectInfo {
                key: prefix.to_string(),
                size: meta.len(),
                content_type: content_type_for_key(prefix),
            });
            return Ok(results);
        }

        // Depth-first walk without async recursion
        let mut pending = vec![(base, prefix.to_string())];
        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = format!("{key_prefix}/{name}");
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), key));
                } else {
                    let meta = entry.metadata().await?;
                    results.push(ObjectInfo {
                        content_type: content_type_for_key(&key),
                        key,
                        size: meta.len(),
                    });
                }
            }
        }

        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                self.prune_empty_parents(path).await;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
