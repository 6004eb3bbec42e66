// Platform-dependent media handling
//
// Reading a picked video into an HTTP body and deriving a thumbnail from it
// are the only operations that differ between runtimes:
// - Native: local files, thumbnails written as JPEG files
// - Web: URL-addressed media, thumbnails exported as data URIs
//
// The runtime is chosen once from configuration; everything downstream of
// `MediaRuntime` is runtime-agnostic.

pub mod commands;
pub mod native;
pub mod web;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;

pub use commands::*;

use crate::config::{MediaConfig, RuntimeKind};
use crate::error::{ComposerError, Result, ThumbnailError};
use crate::models::MediaHandle;

/// Capabilities the upload pipeline needs from the platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaRuntime: Send + Sync {
    fn kind(&self) -> RuntimeKind;

    /// Materialize the picked media as a PUT body.
    async fn read_binary(&self, source: &MediaHandle) -> Result<Bytes>;

    /// Produce a thumbnail URI for the picked video. `payload` is what
    /// `read_binary` returned for `source`.
    async fn make_thumbnail(&self, source: &MediaHandle, payload: &Bytes) -> std::result::Result<String, ThumbnailError>;
}

/// Factory for creating media runtime instances
pub struct MediaRuntimeFactory;

impl MediaRuntimeFactory {
    pub fn create_runtime(config: MediaConfig) -> Arc<dyn MediaRuntime> {
        match config.runtime {
            RuntimeKind::Native => Arc::new(native::NativeRuntime::new(config)),
            RuntimeKind::Web => Arc::new(web::WebRuntime::new(config)),
        }
    }
}

/// Local filesystem path behind a `file://` URI or bare path.
pub fn local_path(uri: &str) -> Option<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if uri.contains("://") || uri.starts_with("data:") {
        return None;
    }
    Some(PathBuf::from(uri))
}

/// Split a `data:` URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ComposerError::UnsupportedSource(format!("not a data URI: {}", truncate(uri))))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ComposerError::UnsupportedSource("data URI without payload".to_string()))?;

    let (mime, is_base64) = match meta.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (meta, false),
    };
    if !is_base64 {
        return Err(ComposerError::UnsupportedSource(
            "only base64 data URIs carry binary media".to_string(),
        ));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ComposerError::Media(format!("Invalid base64 payload: {}", e)))?;
    let mime = if mime.is_empty() { "application/octet-stream" } else { mime };
    Ok((mime.to_string(), bytes))
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

fn truncate(uri: &str) -> &str {
    match uri.char_indices().nth(48) {
        Some((idx, _)) => &uri[..idx],
        None => uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:///tmp/a.mov"), Some(PathBuf::from("/tmp/a.mov")));
        assert_eq!(local_path("/tmp/a.mov"), Some(PathBuf::from("/tmp/a.mov")));
        assert_eq!(local_path("https://cdn/a.mov"), None);
        assert_eq!(local_path("data:video/mp4;base64,AAAA"), None);
    }

    #[test]
    fn test_data_uri_decoding() {
        let uri = encode_data_uri("image/jpeg", &[0xff, 0xd8, 0xff]);
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn test_data_uri_rejects_plain_text() {
        assert!(decode_data_uri("data:text/plain,hello").is_err());
        assert!(decode_data_uri("data:video/mp4;base64").is_err());
        assert!(decode_data_uri("https://cdn/a.mov").is_err());
        assert!(matches!(
            decode_data_uri("data:video/mp4;base64,@@@"),
            Err(ComposerError::Media(_))
        ));
    }

    #[test]
    fn test_factory_honours_runtime_kind() {
        let mut config = MediaConfig::default();
        config.runtime = RuntimeKind::Web;
        assert_eq!(MediaRuntimeFactory::create_runtime(config).kind(), RuntimeKind::Web);
        assert_eq!(
            MediaRuntimeFactory::create_runtime(MediaConfig::default()).kind(),
            RuntimeKind::Native
        );
    }
}
