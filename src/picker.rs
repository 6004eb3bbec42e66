use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ComposerError, Result};
use crate::models::MediaHandle;

/// Fallback when the extension says nothing useful.
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Platform chooser for a local video.
#[async_trait]
pub trait MediaPicker: Send + Sync {
    /// `None` when the user dismissed the chooser.
    async fn pick(&self) -> Result<Option<MediaHandle>>;
}

/// Maps a video file extension to its MIME type.
pub fn detect_content_type(path: &str) -> Option<&'static str> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("mp4" | "m4v") => Some("video/mp4"),
        Some("mov" | "qt") => Some("video/quicktime"),
        Some("webm") => Some("video/webm"),
        Some("mkv") => Some("video/x-matroska"),
        Some("avi") => Some("video/x-msvideo"),
        Some("3gp") => Some("video/3gpp"),
        _ => None,
    }
}

/// Picker backed by a path chosen up front (CLI argument, file dialog result).
pub struct FilePicker {
    path: Option<PathBuf>,
}

impl FilePicker {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: Some(path.into()) }
    }

    /// A picker the user dismissed.
    pub fn dismissed() -> Self {
        Self { path: None }
    }
}

#[async_trait]
impl MediaPicker for FilePicker {
    async fn pick(&self) -> Result<Option<MediaHandle>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| ComposerError::FileNotFound(path.display().to_string()))?;
        if !metadata.is_file() {
            return Err(ComposerError::FileNotFound(path.display().to_string()));
        }

        let absolute = tokio::fs::canonicalize(path).await?;
        let filename = absolute
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = detect_content_type(&filename).unwrap_or(DEFAULT_VIDEO_MIME);

        debug!("Picked {} ({})", absolute.display(), mime_type);

        Ok(Some(MediaHandle::new(
            format!("file://{}", absolute.display()),
            filename,
            mime_type,
        )))
    }
}
