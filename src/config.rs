use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{ComposerError, Result};

fn default_url_expiry_secs() -> u64 {
    60
}

fn default_key_extension() -> String {
    "mov".to_string()
}

fn default_thumbnail_offset_secs() -> f64 {
    1.5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST backend, without trailing slash
    pub base_url: String,
    /// Request timeout for backend calls
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Target bucket for exercise videos
    pub bucket: String,
    /// Bucket region, also used to derive public URLs
    pub region: String,
    /// Access key used for signing upload URLs
    #[serde(default)]
    pub access_key_id: String,
    /// Secret key used for signing upload URLs
    #[serde(default)]
    pub secret_access_key: String,
    /// Lifetime of a presigned write URL
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u64,
    /// Extension appended to generated object keys
    #[serde(default = "default_key_extension")]
    pub key_extension: String,
}

/// Which platform flavour reads media and renders thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeKind {
    /// Local files, thumbnails written next to the configured thumbnail dir
    Native,
    /// URL-addressed media, thumbnails exported as data URIs
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub runtime: RuntimeKind,
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Seek position for thumbnail frames
    #[serde(default = "default_thumbnail_offset_secs")]
    pub thumbnail_offset_secs: f64,
    /// Where native thumbnails are written
    pub thumbnail_dir: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            url_expiry_secs: default_url_expiry_secs(),
            key_extension: default_key_extension(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeKind::Native,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            thumbnail_offset_secs: default_thumbnail_offset_secs(),
            thumbnail_dir: ".routine-composer/thumbnails".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ComposerError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ComposerError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ComposerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ComposerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Overlay process environment onto the loaded values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Some(bucket) = non_empty("S3_BUCKET_NAME") {
            self.storage.bucket = bucket;
        }
        if let Some(region) = non_empty("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(key) = non_empty("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = key;
        }
        if let Some(secret) = non_empty("AWS_SECRET_ACCESS_KEY").or_else(|| non_empty("AWS_SECRET_KEY_ID")) {
            self.storage.secret_access_key = secret;
        }
    }

    /// Check the values the upload path cannot work without.
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ComposerError::Config("backend.base_url is empty".to_string()));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ComposerError::Config("storage.bucket is empty".to_string()));
        }
        if self.storage.region.trim().is_empty() {
            return Err(ComposerError::Config("storage.region is empty".to_string()));
        }
        if self.storage.url_expiry_secs == 0 {
            return Err(ComposerError::Config("storage.url_expiry_secs must be positive".to_string()));
        }
        if self.media.thumbnail_offset_secs < 0.0 {
            return Err(ComposerError::Config("media.thumbnail_offset_secs must not be negative".to_string()));
        }
        Ok(())
    }
}
