use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{MediaCommandBuilder, MediaRuntime, clamp_offset, decode_data_uri, local_path, parse_duration};
use crate::config::{MediaConfig, RuntimeKind};
use crate::error::{ComposerError, Result, ThumbnailError};
use crate::models::MediaHandle;

/// Device-local media: files on disk, ffmpeg frame grabs to JPEG files.
pub struct NativeRuntime {
    config: MediaConfig,
    commands: MediaCommandBuilder,
}

impl NativeRuntime {
    pub fn new(config: MediaConfig) -> Self {
        let commands = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);
        Self { config, commands }
    }

    fn source_path(source: &MediaHandle) -> Result<PathBuf> {
        local_path(&source.uri).ok_or_else(|| {
            ComposerError::UnsupportedSource(format!("native runtime needs a local file: {}", source.uri))
        })
    }

    /// Probe failures fall back to the unclamped offset.
    async fn seek_offset(&self, video: &Path) -> f64 {
        let duration = match self.commands.probe_duration(video).execute().await {
            Ok(stdout) => parse_duration(&stdout),
            Err(e) => {
                let e = ThumbnailError::Probe(e.to_string());
                warn!("{}", e);
                None
            }
        };
        let offset = clamp_offset(self.config.thumbnail_offset_secs, duration);
        debug!("Thumbnail seek at {:.3}s (duration {:?})", offset, duration);
        offset
    }
}

#[async_trait]
impl MediaRuntime for NativeRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Native
    }

    async fn read_binary(&self, source: &MediaHandle) -> Result<Bytes> {
        // Pickers on some devices hand back inline base64 instead of a path.
        if source.uri.starts_with("data:") {
            let (_, bytes) = decode_data_uri(&source.uri)?;
            return Ok(Bytes::from(bytes));
        }

        let path = Self::source_path(source)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ComposerError::FileNotFound(path.display().to_string()),
            _ => ComposerError::Io(e),
        })?;

        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Bytes::from(bytes))
    }

    async fn make_thumbnail(&self, source: &MediaHandle, _payload: &Bytes) -> std::result::Result<String, ThumbnailError> {
        let video = Self::source_path(source).map_err(|e| ThumbnailError::Extract(e.to_string()))?;

        let thumbnail_dir = PathBuf::from(&self.config.thumbnail_dir);
        tokio::fs::create_dir_all(&thumbnail_dir).await?;
        let output = thumbnail_dir.join(format!("{}.jpg", uuid::Uuid::new_v4()));

        let offset = self.seek_offset(&video).await;
        self.commands.extract_frame(&video, offset, &output).execute().await?;

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(ThumbnailError::Extract("no frame written".to_string()));
        }

        let absolute = tokio::fs::canonicalize(&output).await?;
        info!("Thumbnail written to {}", absolute.display());
        Ok(format!("file://{}", absolute.display()))
    }
}
