use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;
use tracing::{debug, info};

use super::{PresignedUpload, UploadUrlIssuer, generate_object_key, public_object_url};
use crate::config::StorageConfig;
use crate::error::{ComposerError, Result};

/// Signs PUT URLs locally with the configured credentials.
pub struct S3UrlIssuer {
    client: Client,
    bucket: String,
    region: String,
    expiry: Duration,
    key_extension: String,
}

impl S3UrlIssuer {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "routine-composer",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            expiry: Duration::from_secs(config.url_expiry_secs),
            key_extension: config.key_extension.clone(),
        }
    }
}

#[async_trait]
impl UploadUrlIssuer for S3UrlIssuer {
    async fn issue(&self, filename: &str, content_type: &str) -> Result<PresignedUpload> {
        let object_key = generate_object_key(filename, &self.key_extension);

        let presigning = PresigningConfig::expires_in(self.expiry)
            .map_err(|e| ComposerError::Storage(format!("Invalid URL expiry: {}", e)))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| ComposerError::Storage(format!("Failed to presign upload: {}", e)))?;

        debug!("Presigned {} for {}s", object_key, self.expiry.as_secs());
        info!("Issued upload URL for object {}", object_key);

        Ok(PresignedUpload {
            write_url: request.uri().to_string(),
            object_key,
        })
    }

    fn public_url(&self, object_key: &str) -> String {
        public_object_url(&self.bucket, &self.region, object_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_config() -> StorageConfig {
        StorageConfig {
            bucket: "pt-videos".to_string(),
            region: "us-west-2".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn test_issue_signs_locally() {
        let issuer = S3UrlIssuer::new(&storage_config());
        let upload = issuer.issue("squat.mov", "video/quicktime").await.unwrap();

        assert!(upload.object_key.ends_with(".mov"));
        assert!(upload.write_url.starts_with("https://"));
        assert!(upload.write_url.contains(&upload.object_key));
        assert!(upload.write_url.contains("X-Amz-Expires=60"));
        assert!(upload.write_url.contains("X-Amz-Signature="));
    }

    #[test]
    fn test_public_url_from_config() {
        let issuer = S3UrlIssuer::new(&storage_config());
        assert_eq!(
            issuer.public_url("1-abc.mov"),
            "https://pt-videos.s3.us-west-2.amazonaws.com/1-abc.mov"
        );
    }
}
