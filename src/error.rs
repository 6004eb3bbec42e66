use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),
}

pub type Result<T> = std::result::Result<T, ComposerError>;

/// Network step an upload failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Read,
    UrlIssue,
    StorageWrite,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to read media payload: {0}")]
    Read(#[source] ComposerError),

    #[error("Failed to obtain upload URL: {0}")]
    UrlIssueFailed(String),

    #[error("Storage write failed ({status}): {message}")]
    StorageWriteFailed { status: u16, message: String },
}

impl UploadError {
    pub fn stage(&self) -> UploadStage {
        match self {
            Self::Read(_) => UploadStage::Read,
            Self::UrlIssueFailed(_) => UploadStage::UrlIssue,
            Self::StorageWriteFailed { .. } => UploadStage::StorageWrite,
        }
    }
}

/// Thumbnail failures. Always recovered inside the upload pipeline.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Could not probe video duration: {0}")]
    Probe(String),

    #[error("Frame extraction failed: {0}")]
    Extract(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Exercise {index} could not be saved: {source}")]
    ExerciseWriteFailed {
        index: usize,
        #[source]
        source: ComposerError,
    },

    #[error("Routine could not be saved: {0}")]
    RoutineWriteFailed(#[source] ComposerError),

    #[error("Save cancelled after {completed_exercises} exercise(s) were written")]
    Cancelled { completed_exercises: usize },
}

impl SaveError {
    /// True when some writes already reached the backend before the failure.
    pub fn is_partial(&self) -> bool {
        match self {
            Self::InvalidInput(_) => false,
            Self::ExerciseWriteFailed { index, .. } => *index > 0,
            Self::RoutineWriteFailed(_) => true,
            Self::Cancelled { completed_exercises } => *completed_exercises > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_stage() {
        assert_eq!(
            UploadError::UrlIssueFailed("denied".to_string()).stage(),
            UploadStage::UrlIssue
        );
        let err = UploadError::StorageWriteFailed {
            status: 403,
            message: "SignatureDoesNotMatch".to_string(),
        };
        assert_eq!(err.stage(), UploadStage::StorageWrite);
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_save_error_partial() {
        assert!(!SaveError::InvalidInput("name".to_string()).is_partial());
        let first = SaveError::ExerciseWriteFailed {
            index: 0,
            source: ComposerError::Backend { status: 500, detail: "boom".to_string() },
        };
        assert!(!first.is_partial());
        let later = SaveError::ExerciseWriteFailed {
            index: 2,
            source: ComposerError::Backend { status: 500, detail: "boom".to_string() },
        };
        assert!(later.is_partial());
        assert!(later.to_string().contains("Exercise 2"));
    }
}
