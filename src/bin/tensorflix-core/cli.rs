//! Command-line interface definition.

use clap::Parser;
use std::path::PathBuf;
use tensorflix_core::CoreConfig;

/// Attribution, verification and artifact storage core for TensorFlix validators.
///
/// Reads newline-delimited JSON requests from stdin and answers each with one
/// JSON line on stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "tensorflix-core")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory for stored artifacts.
    #[arg(long, env = "TENSORFLIX_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Storage capacity in bytes (0 for unlimited).
    #[arg(long, env = "TENSORFLIX_MAX_STORAGE")]
    pub max_storage: Option<u64>,

    /// SQLite database file.
    #[arg(long, env = "TENSORFLIX_DB")]
    pub database: Option<PathBuf>,

    /// Platform calls allowed per rate-limit period.
    #[arg(long, env = "TENSORFLIX_RATE_REQUESTS")]
    pub rate_requests: Option<u32>,

    /// Rate-limit period in seconds.
    #[arg(long, env = "TENSORFLIX_RATE_PERIOD")]
    pub rate_period: Option<u64>,

    /// YouTube Data API key.
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    /// TikTok access token.
    #[arg(long, env = "TIKTOK_ACCESS_TOKEN", hide_env_values = true)]
    pub tiktok_access_token: Option<String>,

    /// Instagram Graph API access token.
    #[arg(long, env = "INSTAGRAM_ACCESS_TOKEN", hide_env_values = true)]
    pub instagram_access_token: Option<String>,

    /// Log level, overriding `log_level` from the config file.
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub json_logs: bool,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Convert CLI arguments into a `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<CoreConfig> {
        let mut config = if let Some(ref path) = self.config {
            CoreConfig::from_file(path)?
        } else {
            CoreConfig::default()
        };

        if let Some(dir) = self.storage_dir {
            config.storage.root_dir = dir;
        }
        if let Some(max) = self.max_storage {
            config.storage.max_size_bytes = max;
        }
        if self.database.is_some() {
            config.database.path = self.database;
        }
        if let Some(requests) = self.rate_requests {
            config.rate_limit.requests = requests;
        }
        if let Some(period) = self.rate_period {
            config.rate_limit.period_secs = period;
        }
        if let Some(key) = self.youtube_api_key {
            config.platforms.youtube_api_key = key;
        }
        if let Some(token) = self.tiktok_access_token {
            config.platforms.tiktok_access_token = token;
        }
        if let Some(token) = self.instagram_access_token {
            config.platforms.instagram_access_token = token;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config)
    }
}
