mod fs;
mod http;

pub use fs::FsObjectStore;
pub use http::HttpObjectStore;

use async_trait::async_trait;

use crate::error::Result;

/// Credential triple for the durable store, passed explicitly into
/// every write call. Acquisition, expiry and rotation belong to
/// whoever supplies it, not to this service.
#[derive(Debug, Clone)]
pub struct StorageCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl StorageCredentials {
    /// For backends that authenticate out-of-band (the filesystem sink).
    pub fn anonymous() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            session_token: None,
        }
    }
}

/// Write-once object sink. Each run writes exactly one object under a
/// fresh key; an incomplete write must surface as `StorageWrite` so
/// the run-level retry can repeat the whole flow.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: &[u8], credentials: &StorageCredentials) -> Result<()>;
}
