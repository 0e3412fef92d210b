use crate::alert::AlertPolicy;
use crate::pipeline::DEFAULT_POLL_INTERVAL;
use crate::registry::DEFAULT_LIVE_SEGMENT_ID;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    pub feed: FeedSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub alerts: Option<AlertsSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSection {
    /// Realtime database base URL the feed thread polls.
    pub url: String,
    /// Segment wired to live updates (default: 4, Wahat Road).
    pub segment_id: Option<u32>,
    /// Poll cadence in seconds (default: 2).
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertsSection {
    pub warning_threshold: Option<u32>,
    pub closed_threshold: Option<u32>,
    pub popup_secs: Option<u64>,
    pub snooze_secs: Option<u64>,
    pub reopen_minutes: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

/// Persist a new feed URL into the config file, leaving every other setting
/// as written. The running process keeps its current subscription; a restart
/// picks the new source up.
pub fn save_feed_url(path: impl AsRef<Path>, url: &str) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(&path)?;
    let mut table: toml::Table = toml::from_str(&contents)?;

    let feed = table
        .entry("feed".to_string())
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    let feed_table = feed
        .as_table_mut()
        .ok_or_else(|| ConfigError::Invalid("feed section is not a table".to_string()))?;
    feed_table.insert("url".to_string(), toml::Value::String(url.to_string()));

    let rendered = toml::to_string_pretty(&table)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

impl Config {
    pub fn feed_url(&self) -> &str {
        &self.feed.url
    }

    /// Returns the id of the live-linked segment (default: 4).
    pub fn live_segment_id(&self) -> u32 {
        self.feed.segment_id.unwrap_or(DEFAULT_LIVE_SEGMENT_ID)
    }

    /// Returns the feed poll cadence as Duration (default: 2 seconds).
    pub fn poll_interval(&self) -> Duration {
        self.feed
            .poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Alert thresholds and durations, config overrides applied on top of
    /// the built-in policy.
    pub fn alert_policy(&self) -> AlertPolicy {
        let mut policy = AlertPolicy::default();
        if let Some(section) = &self.alerts {
            if let Some(threshold) = section.warning_threshold {
                policy.warning_threshold = threshold;
            }
            if let Some(threshold) = section.closed_threshold {
                policy.closed_threshold = threshold;
            }
            if let Some(secs) = section.popup_secs {
                policy.popup_duration = Duration::from_secs(secs);
            }
            if let Some(secs) = section.snooze_secs {
                policy.snooze_duration = Duration::from_secs(secs);
            }
            if let Some(minutes) = section.reopen_minutes {
                policy.reopen_after = Duration::from_secs(minutes * 60);
            }
        }
        policy
    }
}
