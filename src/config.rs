//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/fred.sqlite"
//!
//! [provider]
//! base_url = "https://api.stlouisfed.org/fred/series"
//! # api_key = "..."            # falls back to FRED_API_KEY
//! timeout_secs = 30
//! max_retries = 3
//!
//! [sync]
//! inter_item_delay_ms = 2000
//! restart_completed_cycle = true
//!
//! [schedule]
//! interval_secs = 3600
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [logging]
//! format = "human"
//! ```
//!
//! Only `[db]` is required. The checkpoint row id and the number of series
//! per step are fixed (see [`fred_sync_core::models`]) and not configurable.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when `provider.api_key` is not set.
pub const API_KEY_ENV: &str = "FRED_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.stlouisfed.org/fred/series".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,
    #[serde(default = "default_restart_completed_cycle")]
    pub restart_completed_cycle: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inter_item_delay_ms: default_inter_item_delay_ms(),
            restart_completed_cycle: default_restart_completed_cycle(),
        }
    }
}

fn default_inter_item_delay_ms() -> u64 {
    2_000
}
fn default_restart_completed_cycle() -> bool {
    true
}

impl SyncConfig {
    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3_600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

fn default_log_format() -> String {
    "human".to_string()
}

impl Config {
    /// Provider API key from the config file, else from `FRED_API_KEY`.
    ///
    /// Resolved lazily so that commands which never call the provider
    /// (`init`, `status`, `series`) work without a key.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.provider.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => bail!(
                "provider.api_key is not set and {} is not in the environment",
                API_KEY_ENV
            ),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate provider
    let base = config.provider.base_url.as_str();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        bail!("provider.base_url must start with http:// or https://");
    }
    if config.provider.timeout_secs == 0 {
        bail!("provider.timeout_secs must be > 0");
    }

    // Validate schedule
    if config.schedule.interval_secs == 0 {
        bail!("schedule.interval_secs must be > 0");
    }

    match config.logging.format.as_str() {
        "human" | "json" => {}
        other => bail!(
            "Unknown logging format: '{}'. Must be human or json.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse_config("[db]\npath = \"./data/fred.sqlite\"\n").unwrap();
        assert_eq!(cfg.db.path, PathBuf::from("./data/fred.sqlite"));
        assert_eq!(cfg.provider.base_url, "https://api.stlouisfed.org/fred/series");
        assert_eq!(cfg.provider.timeout_secs, 30);
        assert_eq!(cfg.provider.max_retries, 3);
        assert_eq!(cfg.sync.inter_item_delay(), Duration::from_millis(2_000));
        assert!(cfg.sync.restart_completed_cycle);
        assert_eq!(cfg.schedule.interval_secs, 3_600);
        assert_eq!(cfg.logging.format, "human");
    }

    #[test]
    fn test_full_config() {
        let cfg = parse_config(
            r#"
[db]
path = "/tmp/fred.sqlite"

[provider]
base_url = "http://127.0.0.1:9999"
api_key = "abc"
timeout_secs = 5
max_retries = 0

[sync]
inter_item_delay_ms = 10000
restart_completed_cycle = false

[schedule]
interval_secs = 60

[server]
bind = "0.0.0.0:8080"

[logging]
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(cfg.api_key().unwrap(), "abc");
        assert_eq!(cfg.sync.inter_item_delay_ms, 10_000);
        assert!(!cfg.sync.restart_completed_cycle);
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_db_section_fails() {
        assert!(parse_config("[sync]\ninter_item_delay_ms = 1\n").is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = parse_config(
            "[db]\npath = \"x.sqlite\"\n[provider]\nbase_url = \"ftp://example\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(parse_config("[db]\npath = \"x.sqlite\"\n[provider]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(parse_config("[db]\npath = \"x.sqlite\"\n[schedule]\ninterval_secs = 0\n").is_err());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(parse_config("[db]\npath = \"x.sqlite\"\n[logging]\nformat = \"xml\"\n").is_err());
    }
}
