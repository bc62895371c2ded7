//! Configuration loaded from the environment.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the bot binary.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Bot API token used for downloads, archival and replies
    pub bot_token: String,
    /// Public base URL; when set, the webhook is registered on startup
    pub webhook_url: Option<String>,
    /// Chat id of the write-once archive channel
    pub archive_channel_id: i64,
    /// Redis connection URL for the thumbnail cache and archive references
    pub redis_url: String,
    /// Upload endpoint of the public image host
    pub hosting_url: String,
    /// Admitted requests per submitter inside one window
    pub rate_limit_requests: usize,
    pub rate_limit_window: Duration,
    /// Attachments above this size are rejected before download
    pub max_upload_bytes: u64,
    pub max_thumbnails: usize,
    /// Concurrent thumbnail uploads across all submissions
    pub publish_workers: usize,
    pub download_timeout: Duration,
    pub archive_timeout: Duration,
    pub upload_timeout: Duration,
    /// Archive references older than this are purged
    pub retention: chrono::Duration,
    pub retention_interval: Duration,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} env var required", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let archive_channel_id = parse("ARCHIVE_CHANNEL_ID", Some(required("ARCHIVE_CHANNEL_ID")?))?
            .ok_or(ConfigError::Missing("ARCHIVE_CHANNEL_ID"))?;

        let retention_days: i64 = parse("RETENTION_DAYS", lookup("RETENTION_DAYS"))?.unwrap_or(30);

        Ok(Self {
            addr: text("ADDR", "127.0.0.1"),
            port: text("PORT", "8080"),
            bot_token: required("BOT_TOKEN")?,
            webhook_url: lookup("WEBHOOK_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            archive_channel_id,
            redis_url: text("REDIS_URL", "redis://127.0.0.1/"),
            hosting_url: text("HOSTING_URL", "https://catbox.moe/user/api.php"),
            rate_limit_requests: parse("RATE_LIMIT_REQUESTS", lookup("RATE_LIMIT_REQUESTS"))?
                .unwrap_or(15),
            rate_limit_window: secs("RATE_LIMIT_WINDOW_SECS", &lookup, 60)?,
            max_upload_bytes: parse("MAX_UPLOAD_BYTES", lookup("MAX_UPLOAD_BYTES"))?
                .unwrap_or(200 * 1024 * 1024),
            max_thumbnails: parse("MAX_THUMBNAILS", lookup("MAX_THUMBNAILS"))?.unwrap_or(5),
            publish_workers: parse("PUBLISH_WORKERS", lookup("PUBLISH_WORKERS"))?.unwrap_or(3),
            download_timeout: secs("DOWNLOAD_TIMEOUT_SECS", &lookup, 300)?,
            archive_timeout: secs("ARCHIVE_TIMEOUT_SECS", &lookup, 300)?,
            upload_timeout: secs("UPLOAD_TIMEOUT_SECS", &lookup, 120)?,
            retention: chrono::Duration::days(retention_days),
            retention_interval: secs("RETENTION_INTERVAL_SECS", &lookup, 6 * 60 * 60)?,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn secs<F>(key: &'static str, lookup: &F, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(Duration::from_secs(parse(key, lookup(key))?.unwrap_or(default)))
}
