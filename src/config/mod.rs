//! Configuration management for Cinedex

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Default backend URL (local development server)
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default image host upload base
pub const DEFAULT_UPLOAD_HOST: &str = "https://api.cloudinary.com/v1_1";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Movie catalog backend base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Transport timeout for backend requests
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Image host settings for poster uploads
    #[serde(default)]
    pub upload: UploadConfig,

    /// Query cache freshness and retention windows
    #[serde(default)]
    pub cache: CacheSettings,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// Image host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload endpoint base; the cloud name and `/image/upload` are appended
    #[serde(default = "default_upload_host")]
    pub host: String,

    /// Public API key sent alongside the backend-issued signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            host: default_upload_host(),
            api_key: None,
        }
    }
}

/// Cache windows, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_list_stale")]
    pub list_stale_secs: u64,
    #[serde(default = "default_list_gc")]
    pub list_gc_secs: u64,
    #[serde(default = "default_detail_stale")]
    pub detail_stale_secs: u64,
    #[serde(default = "default_detail_gc")]
    pub detail_gc_secs: u64,
    /// Interval of the background sweep; 0 disables it
    #[serde(default = "default_gc_interval")]
    pub gc_interval_secs: u64,
    /// Serve stale entries at once and refresh them in the background
    #[serde(default)]
    pub stale_while_revalidate: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            list_stale_secs: default_list_stale(),
            list_gc_secs: default_list_gc(),
            detail_stale_secs: default_detail_stale(),
            detail_gc_secs: default_detail_gc(),
            gc_interval_secs: default_gc_interval(),
            stale_while_revalidate: false,
        }
    }
}

impl CacheSettings {
    /// Background sweep interval, if enabled
    pub fn gc_interval(&self) -> Option<Duration> {
        (self.gc_interval_secs > 0).then(|| Duration::from_secs(self.gc_interval_secs))
    }
}

/// User preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Default number of movies per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            format: None,
            page_size: default_page_size(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_upload_host() -> String {
    DEFAULT_UPLOAD_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_list_stale() -> u64 {
    5 * 60
}

fn default_list_gc() -> u64 {
    10 * 60
}

fn default_detail_stale() -> u64 {
    5 * 60
}

fn default_detail_gc() -> u64 {
    30 * 60
}

fn default_gc_interval() -> u64 {
    60
}

fn default_page_size() -> u32 {
    10
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".cinedex").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete config path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration, falling back to defaults when the file is absent.
    ///
    /// Environment overrides are applied on top of the file.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Path of the session database, kept beside the config file
    pub fn session_db_path(config_path: Option<&str>) -> Result<PathBuf> {
        let path = Self::resolve_path(config_path)?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(dir.join("session.db"))
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("CINEDEX_UPLOAD_HOST") {
            self.upload.host = host;
        }
        if let Ok(key) = std::env::var("CINEDEX_UPLOAD_API_KEY") {
            self.upload.api_key = Some(key);
        }
    }

    /// Apply a runtime API URL override (from `--api-url` / `CINEDEX_API_URL`)
    pub fn with_api_url(mut self, api_url: Option<&str>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url.to_string();
        }
        self
    }

    /// Validate values that serde cannot check
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.api_url)
            .map_err(|e| ConfigError::Invalid(format!("api_url '{}': {}", self.api_url, e)))?;
        if self.preferences.page_size == 0 {
            return Err(ConfigError::Invalid("preferences.page_size must be > 0".to_string()).into());
        }
        Ok(())
    }

    /// Per-request timeout for API and upload calls
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Normalized API base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_timeout_secs(),
            upload: UploadConfig::default(),
            cache: CacheSettings::default(),
            preferences: Preferences::default(),
        }
    }
}
