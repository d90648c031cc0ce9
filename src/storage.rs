use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to download audio file: {0}")]
    Status(u16),
    #[error("Storage request failed: {0}")]
    Request(String),
    #[error("Failed to write downloaded audio: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of stored audio objects.
pub trait ObjectStore: Send + Sync {
    /// Stream the object at `storage_path` into `dest`, returning the byte count.
    fn download(&self, storage_path: &str, dest: &mut dyn Write) -> Result<u64, StorageError>;
}

/// Authenticated object download over HTTP from a storage bucket.
pub struct HttpObjectStore {
    client: reqwest::blocking::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, bucket: &str, service_key: String) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key,
        })
    }

    pub fn object_url(&self, storage_path: &str) -> String {
        object_url(&self.base_url, &self.bucket, storage_path)
    }
}

pub fn object_url(base_url: &str, bucket: &str, storage_path: &str) -> String {
    format!(
        "{}/storage/v1/object/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        storage_path.trim_start_matches('/')
    )
}

impl ObjectStore for HttpObjectStore {
    fn download(&self, storage_path: &str, dest: &mut dyn Write) -> Result<u64, StorageError> {
        let url = self.object_url(storage_path);
        log::debug!("Downloading {}", url);

        let mut response = self
            .client
            .get(&url)
            .bearer_auth(&self.service_key)
            .send()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(StorageError::Status(status.as_u16()));
        }

        let bytes = std::io::copy(&mut response, dest)?;
        Ok(bytes)
    }
}
