use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use super::StorageWriter;
use crate::error::UploadError;

/// PUTs payloads to presigned URLs.
pub struct HttpStorageWriter {
    client: Client,
}

impl HttpStorageWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpStorageWriter {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl StorageWriter for HttpStorageWriter {
    async fn put(&self, write_url: &str, content_type: &str, body: Bytes) -> Result<(), UploadError> {
        let size = body.len();
        debug!("PUT {} bytes ({})", size, content_type);

        let response = self
            .client
            .put(write_url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::StorageWriteFailed {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::StorageWriteFailed {
                status: status.as_u16(),
                message,
            });
        }

        info!("Stored {} bytes", size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadStage;

    #[tokio::test]
    async fn test_unreachable_host_is_storage_write_failure() {
        let writer = HttpStorageWriter::default();
        let err = writer
            .put("http://127.0.0.1:9/bucket/key.mov", "video/mp4", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), UploadStage::StorageWrite);
        assert!(matches!(err, UploadError::StorageWriteFailed { status: 0, .. }));
    }
}
