// Object storage for exercise media
//
// Uploads go straight from the client to the bucket through short-lived
// presigned write URLs:
// - s3: issues presigned PUT URLs with aws-sdk-s3
// - http: performs the PUT itself

pub mod http;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

pub use http::HttpStorageWriter;
pub use s3::S3UrlIssuer;

use crate::error::{Result, UploadError};

/// A write URL and the object it will create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUpload {
    pub write_url: String,
    pub object_key: String,
}

/// Issues time-limited, single-object write URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadUrlIssuer: Send + Sync {
    /// Generate a fresh object key and a write URL for it.
    async fn issue(&self, filename: &str, content_type: &str) -> Result<PresignedUpload>;

    /// Public read URL of an object; never needs a round trip.
    fn public_url(&self, object_key: &str) -> String;
}

/// Writes a payload to a presigned URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageWriter: Send + Sync {
    async fn put(&self, write_url: &str, content_type: &str, body: Bytes) -> std::result::Result<(), UploadError>;
}

/// `https://{bucket}.s3.{region}.amazonaws.com/{key}`
pub fn public_object_url(bucket: &str, region: &str, object_key: &str) -> String {
    format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        bucket,
        region,
        object_key.trim_start_matches('/')
    )
}

/// Millisecond timestamp plus a random suffix, keeping the picked file's
/// extension when it has one.
pub fn generate_object_key(filename: &str, default_extension: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| default_extension.trim_start_matches('.').to_string());

    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}.{}", millis, &suffix[..8], extension)
}
