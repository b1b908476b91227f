use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{ObjectStore, StorageCredentials};
use crate::error::{AppError, Result};

/// Local directory sink. Keys become file names under the root;
/// intended for development and air-gapped runs.
///
/// Bodies are staged to a temporary name and renamed onto the final
/// key only once fully written, so a reader never observes a partial
/// object.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, body: &[u8], _credentials: &StorageCredentials) -> Result<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::StorageWrite(format!("create {}: {}", parent.display(), e))
            })?;
        }

        let staging = staging_path(&path);
        if let Err(e) = tokio::fs::write(&staging, body).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(AppError::StorageWrite(format!(
                "write {}: {}",
                staging.display(),
                e
            )));
        }
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(AppError::StorageWrite(format!(
                "rename {}: {}",
                path.display(),
                e
            )));
        }

        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
