use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{MediaCommandBuilder, MediaRuntime, clamp_offset, decode_data_uri, encode_data_uri, parse_duration};
use crate::config::{MediaConfig, RuntimeKind};
use crate::error::{ComposerError, Result, ThumbnailError};
use crate::models::MediaHandle;

/// URL-addressed media. Sources are fetched like a browser would, and
/// thumbnails come back as `data:image/jpeg` URIs instead of files.
pub struct WebRuntime {
    client: Client,
    config: MediaConfig,
    commands: MediaCommandBuilder,
}

impl WebRuntime {
    pub fn new(config: MediaConfig) -> Self {
        let commands = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);
        Self {
            client: Client::new(),
            config,
            commands,
        }
    }

    async fn fetch(&self, uri: &str) -> Result<Bytes> {
        if uri.starts_with("data:") {
            let (_, bytes) = decode_data_uri(uri)?;
            return Ok(Bytes::from(bytes));
        }
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(ComposerError::UnsupportedSource(format!(
                "web runtime cannot fetch {}",
                uri
            )));
        }

        debug!("Fetching media from {}", uri);
        let response = self.client.get(uri).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ComposerError::Media(format!("Fetching {} returned {}", uri, status)));
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl MediaRuntime for WebRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Web
    }

    async fn read_binary(&self, source: &MediaHandle) -> Result<Bytes> {
        let body = self.fetch(&source.uri).await?;
        debug!("Materialized {} bytes for {}", body.len(), source.filename);
        Ok(body)
    }

    async fn make_thumbnail(&self, source: &MediaHandle, payload: &Bytes) -> std::result::Result<String, ThumbnailError> {
        if payload.is_empty() {
            return Err(ThumbnailError::Extract("empty video payload".to_string()));
        }

        // ffmpeg needs a seekable file for the container index.
        let video = payload.clone();
        let scratch = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut scratch = NamedTempFile::new()?;
            scratch.write_all(&video)?;
            scratch.flush()?;
            Ok(scratch)
        })
        .await
        .map_err(|e| ThumbnailError::Extract(format!("Scratch file task failed: {}", e)))??;

        let duration = match self.commands.probe_duration(scratch.path()).execute().await {
            Ok(stdout) => parse_duration(&stdout),
            Err(e) => {
                warn!("{}", ThumbnailError::Probe(e.to_string()));
                None
            }
        };
        let offset = clamp_offset(self.config.thumbnail_offset_secs, duration);

        let frame = self
            .commands
            .extract_frame_to_pipe(scratch.path(), offset)
            .execute()
            .await?;
        if frame.is_empty() {
            return Err(ThumbnailError::Extract("empty frame".to_string()));
        }

        info!("Captured {} byte thumbnail for {}", frame.len(), source.filename);
        Ok(encode_data_uri("image/jpeg", &frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> WebRuntime {
        WebRuntime::new(MediaConfig {
            runtime: RuntimeKind::Web,
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
            ..MediaConfig::default()
        })
    }

    #[tokio::test]
    async fn test_read_data_uri() {
        let handle = MediaHandle::new(encode_data_uri("video/webm", b"webm!"), "clip.webm", "video/webm");
        let body = runtime().read_binary(&handle).await.unwrap();
        assert_eq!(&body[..], b"webm!");
    }

    #[tokio::test]
    async fn test_read_rejects_local_paths() {
        let handle = MediaHandle::new("file:///tmp/clip.mp4", "clip.mp4", "video/mp4");
        let err = runtime().read_binary(&handle).await.unwrap_err();
        assert!(matches!(err, ComposerError::UnsupportedSource(_)));
    }

    #[tokio::test]
    async fn test_thumbnail_of_empty_payload() {
        let handle = MediaHandle::new("https://cdn.example.com/clip.mp4", "clip.mp4", "video/mp4");
        let err = runtime().make_thumbnail(&handle, &Bytes::new()).await.unwrap_err();
        assert!(matches!(err, ThumbnailError::Extract(_)));
    }

    #[tokio::test]
    async fn test_thumbnail_without_ffmpeg_is_extract_error() {
        // Never fetched: the thumbnail works from the payload already read.
        let handle = MediaHandle::new("https://unreachable.invalid/clip.mp4", "clip.mp4", "video/mp4");
        let err = runtime()
            .make_thumbnail(&handle, &Bytes::from_static(b"bytes"))
            .await
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Extract(_)));
    }
}
