use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub https: Option<HttpsConfig>,
    pub media_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpsConfig {
    pub enabled: bool,
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA timezone name used to localize "now" before any date or
    /// time-of-day extraction.
    pub timezone: String,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_sync_interval() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    5 * 60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.timezone()?;
        Ok(config)
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.scheduler
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone: {}", self.scheduler.timezone))
    }

    pub fn media_path(&self) -> &str {
        self.server.media_path.as_deref().unwrap_or("static/media")
    }

    pub fn default_template() -> &'static str {
        r#"[server]
host = "0.0.0.0"
port = 8080

[server.https]
enabled = false
cert_path = "certs/cert.pem"
key_path = "certs/key.pem"

# Optional: directory that material files are served from.
# media_path = "static/media"

[database]
# URL for the SQLite database. Ensure the directory exists.
url = "sqlite://reklamo.db"

[scheduler]
# Local timezone for all schedule evaluation.
timezone = "Europe/Warsaw"
# How often the status synchronization job runs, in seconds.
sync_interval_secs = 60
# How often expired materials are hard-deleted, in seconds.
cleanup_interval_secs = 300

[logging]
level = "info"
"#
    }
}
