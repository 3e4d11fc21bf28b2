//! Configuration for tensorflix-core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Artifact storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Platform API budget.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Post verification configuration.
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Gaming detection configuration.
    #[serde(default)]
    pub gaming: GamingConfig,

    /// Virality thresholds.
    #[serde(default)]
    pub virality: ViralityConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Platform client credentials and pacing.
    #[serde(default)]
    pub platforms: PlatformConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding stored artifacts.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Capacity in bytes (0 for unlimited).
    #[serde(default = "default_max_storage")]
    pub max_size_bytes: u64,
}

/// Token-bucket parameters for outbound platform calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity (calls per period).
    #[serde(default = "default_rate_requests")]
    pub requests: u32,

    /// Replenishment period in seconds.
    #[serde(default = "default_rate_period")]
    pub period_secs: u64,

    /// Cost accounted per allowed call.
    #[serde(default)]
    pub call_cost: f64,
}

/// Post verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Permitted difference between post time and reference time, in seconds.
    #[serde(default = "default_allowed_drift")]
    pub allowed_drift_secs: f64,
}

/// Gaming detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamingConfig {
    /// Likes-per-view ratio above which a post is flagged.
    #[serde(default = "default_like_view_ratio")]
    pub like_view_ratio_threshold: f64,
}

/// Virality thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViralityConfig {
    /// Minimum views for a post to be considered viral.
    #[serde(default = "default_view_threshold")]
    pub view_threshold: f64,

    /// Minimum (likes + comments + shares) / views.
    #[serde(default = "default_engagement_rate")]
    pub engagement_rate_threshold: f64,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `tensorflix.db` in the data directory, next
    /// to (never inside) the default storage root.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Idle connections kept in the pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

/// Platform client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// YouTube Data API key.
    #[serde(default)]
    pub youtube_api_key: String,

    /// TikTok Display API access token.
    #[serde(default)]
    pub tiktok_access_token: String,

    /// Instagram Graph API access token.
    #[serde(default)]
    pub instagram_access_token: String,

    /// Minimum spacing between calls made by one client, in milliseconds.
    #[serde(default = "default_min_call_interval")]
    pub min_call_interval_ms: u64,

    /// Total request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            rate_limit: RateLimitConfig::default(),
            verification: VerificationConfig::default(),
            gaming: GamingConfig::default(),
            virality: ViralityConfig::default(),
            database: DatabaseConfig::default(),
            platforms: PlatformConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            max_size_bytes: default_max_storage(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: default_rate_requests(),
            period_secs: default_rate_period(),
            call_cost: 0.0,
        }
    }
}

impl RateLimitConfig {
    /// Replenishment period as a [`Duration`].
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            allowed_drift_secs: default_allowed_drift(),
        }
    }
}

impl Default for GamingConfig {
    fn default() -> Self {
        Self {
            like_view_ratio_threshold: default_like_view_ratio(),
        }
    }
}

impl Default for ViralityConfig {
    fn default() -> Self {
        Self {
            view_threshold: default_view_threshold(),
            engagement_rate_threshold: default_engagement_rate(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: default_pool_size(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: String::new(),
            tiktok_access_token: String::new(),
            instagram_access_token: String::new(),
            min_call_interval_ms: default_min_call_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl PlatformConfig {
    /// Minimum spacing between calls as a [`Duration`].
    #[must_use]
    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "tensorflix")
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
}

fn default_root_dir() -> PathBuf {
    default_data_dir().join("storage")
}

const fn default_max_storage() -> u64 {
    500 * 1024 * 1024 * 1024 // 500 GiB
}

const fn default_rate_requests() -> u32 {
    10
}

const fn default_rate_period() -> u64 {
    60
}

const fn default_allowed_drift() -> f64 {
    600.0
}

const fn default_like_view_ratio() -> f64 {
    10.0
}

const fn default_view_threshold() -> f64 {
    100_000.0
}

const fn default_engagement_rate() -> f64 {
    0.1
}

const fn default_pool_size() -> usize {
    5
}

const fn default_min_call_interval() -> u64 {
    1000
}

const fn default_request_timeout() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CoreConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved database file path.
    ///
    /// Unset, it lives in the data directory rather than the storage root,
    /// so no artifact name can collide with the database files.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("tensorflix.db"))
    }
}
