//! Object storage for product images.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;

/// Errors from object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API rejected the upload.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Bucket or key is not usable in a URL.
    #[error("invalid object path: {0}")]
    InvalidPath(String),
}

/// Stores blobs and returns their public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `bytes` to `bucket/key` and return the public URL.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Supabase Storage REST client.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    storage_url: Url,
}

impl SupabaseStorage {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns an error if the project URL or service key is unusable.
    pub fn new(config: &SupabaseConfig) -> Result<Self, StorageError> {
        let key = config.service_role_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| StorageError::InvalidPath(format!("invalid service key: {e}")))?,
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| StorageError::InvalidPath(format!("invalid service key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        let storage_url = config
            .url
            .join("storage/v1/")
            .map_err(|e| StorageError::InvalidPath(e.to_string()))?;

        Ok(Self {
            client,
            storage_url,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        self.storage_url
            .join(&format!("object/{bucket}/{key}"))
            .map_err(|e| StorageError::InvalidPath(e.to_string()))
    }

    fn public_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        self.storage_url
            .join(&format!("object/public/{bucket}/{key}"))
            .map_err(|e| StorageError::InvalidPath(e.to_string()))
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if bucket.contains(['/', '?', '#']) || key.contains(['?', '#']) || key.contains("..") {
            return Err(StorageError::InvalidPath(format!("{bucket}/{key}")));
        }

        let response = self
            .client
            .post(self.object_url(bucket, key)?)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(self.public_url(bucket, key)?.to_string())
    }
}
