use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use super::{ObjectStore, StorageCredentials};
use crate::error::{AppError, Result};
use crate::fetcher::truncate_body;

const REQUEST_TIMEOUT_SECONDS: u64 = 60;

/// S3-compatible gateway sink: `PUT {endpoint}/{bucket}/{key}` with the
/// credential triple attached per request. Request signing happens at
/// the gateway, not here.
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, bucket: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("owm-ingest/0.1.0")
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, body: &[u8], credentials: &StorageCredentials) -> Result<()> {
        let url = self.object_url(key);
        debug!("Writing {} bytes to {}", body.len(), url);

        let mut request = self
            .client
            .put(&url)
            .basic_auth(&credentials.access_key, Some(&credentials.secret_key))
            .header(CONTENT_TYPE, "text/csv")
            .body(body.to_vec());

        if let Some(token) = &credentials.session_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::StorageWrite(format!("PUT {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let reply = response.text().await.unwrap_or_default();
            return Err(AppError::StorageWrite(format!(
                "PUT {} returned {}: {}",
                url,
                status,
                truncate_body(&reply)
            )));
        }

        Ok(())
    }
}
