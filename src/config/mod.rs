//! Configuration management
//!
//! This module handles loading and parsing configuration for the Inventrack client.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Session watchdog configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Barcode scanner configuration
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Client state persistence
    #[serde(default)]
    pub store: StoreConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Session watchdog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity ceiling before a forced logout (default: 5 hours)
    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,
    /// How long before token expiry the renewal prompt appears (default: 5 minutes)
    #[serde(default = "default_warning_lead_seconds")]
    pub warning_lead_seconds: u64,
    /// Period of the session check (default: 60 seconds)
    #[serde(default = "default_check_interval_seconds")]
    pub check_interval_seconds: u64,
    /// Pause between a failed renewal and the forced logout
    #[serde(default = "default_renewal_failure_delay_ms")]
    pub renewal_failure_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: default_idle_timeout_seconds(),
            warning_lead_seconds: default_warning_lead_seconds(),
            check_interval_seconds: default_check_interval_seconds(),
            renewal_failure_delay_ms: default_renewal_failure_delay_ms(),
        }
    }
}

fn default_idle_timeout_seconds() -> u64 {
    5 * 60 * 60
}

fn default_warning_lead_seconds() -> u64 {
    5 * 60
}

fn default_check_interval_seconds() -> u64 {
    60
}

fn default_renewal_failure_delay_ms() -> u64 {
    2000
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn warning_lead(&self) -> Duration {
        Duration::from_secs(self.warning_lead_seconds)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn renewal_failure_delay(&self) -> Duration {
        Duration::from_millis(self.renewal_failure_delay_ms)
    }
}

/// Barcode scanner configuration
///
/// The timing thresholds are empirical and may need per-device tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Idle gap after the last keystroke that flushes the buffer
    #[serde(default = "default_idle_flush_ms")]
    pub idle_flush_ms: u64,
    /// Inter-keystroke gap below which a key counts as part of a scanner burst
    #[serde(default = "default_burst_interval_ms")]
    pub burst_interval_ms: u64,
    /// An idle flush only happens once the buffer is longer than this
    #[serde(default = "default_min_flush_length")]
    pub min_flush_length: usize,
    /// Play a confirmation chime after each successful scan
    #[serde(default = "default_chime")]
    pub chime: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            idle_flush_ms: default_idle_flush_ms(),
            burst_interval_ms: default_burst_interval_ms(),
            min_flush_length: default_min_flush_length(),
            chime: default_chime(),
        }
    }
}

fn default_idle_flush_ms() -> u64 {
    100
}

fn default_burst_interval_ms() -> u64 {
    50
}

fn default_min_flush_length() -> usize {
    3
}

fn default_chime() -> bool {
    true
}

impl ScannerConfig {
    pub fn idle_flush(&self) -> Duration {
        Duration::from_millis(self.idle_flush_ms)
    }
}

/// Client state persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store driver (memory or file)
    #[serde(default)]
    pub driver: StoreDriver,
    /// Path of the state file when the file driver is used
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: StoreDriver::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/client-state.json")
}

/// Store driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreDriver {
    /// JSON file on disk (default)
    #[default]
    File,
    /// Process memory only
    Memory,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - INVENTRACK_API_URL (legacy VITE_API_URL is honoured when unset)
    /// - INVENTRACK_API_TIMEOUT_SECONDS
    /// - INVENTRACK_SESSION_IDLE_TIMEOUT_SECONDS
    /// - INVENTRACK_SESSION_WARNING_LEAD_SECONDS
    /// - INVENTRACK_SESSION_CHECK_INTERVAL_SECONDS
    /// - INVENTRACK_SCANNER_IDLE_FLUSH_MS
    /// - INVENTRACK_SCANNER_CHIME
    /// - INVENTRACK_STORE_DRIVER
    /// - INVENTRACK_STORE_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the session watchdog cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.check_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "session.check_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.session.warning_lead_seconds >= self.session.idle_timeout_seconds {
            return Err(ConfigError::ValidationError(format!(
                "session.warning_lead_seconds ({}) must be shorter than session.idle_timeout_seconds ({})",
                self.session.warning_lead_seconds, self.session.idle_timeout_seconds
            )));
        }
        if self.scanner.idle_flush_ms == 0 {
            return Err(ConfigError::ValidationError(
                "scanner.idle_flush_ms must be greater than zero".into(),
            ));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("api.base_url is empty".into()));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // API configuration
        if let Ok(url) = std::env::var("INVENTRACK_API_URL") {
            self.api.base_url = url;
        } else if let Ok(url) = std::env::var("VITE_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("INVENTRACK_API_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.api.timeout_seconds = timeout;
            }
        }

        // Session configuration
        if let Ok(idle) = std::env::var("INVENTRACK_SESSION_IDLE_TIMEOUT_SECONDS") {
            if let Ok(idle) = idle.parse::<u64>() {
                self.session.idle_timeout_seconds = idle;
            }
        }
        if let Ok(lead) = std::env::var("INVENTRACK_SESSION_WARNING_LEAD_SECONDS") {
            if let Ok(lead) = lead.parse::<u64>() {
                self.session.warning_lead_seconds = lead;
            }
        }
        if let Ok(interval) = std::env::var("INVENTRACK_SESSION_CHECK_INTERVAL_SECONDS") {
            if let Ok(interval) = interval.parse::<u64>() {
                self.session.check_interval_seconds = interval;
            }
        }

        // Scanner configuration
        if let Ok(flush) = std::env::var("INVENTRACK_SCANNER_IDLE_FLUSH_MS") {
            if let Ok(flush) = flush.parse::<u64>() {
                self.scanner.idle_flush_ms = flush;
            }
        }
        if let Ok(chime) = std::env::var("INVENTRACK_SCANNER_CHIME") {
            match chime.to_lowercase().as_str() {
                "1" | "true" | "on" => self.scanner.chime = true,
                "0" | "false" | "off" => self.scanner.chime = false,
                _ => {} // Ignore invalid values
            }
        }

        // Store configuration
        if let Ok(driver) = std::env::var("INVENTRACK_STORE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "file" => self.store.driver = StoreDriver::File,
                "memory" => self.store.driver = StoreDriver::Memory,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(path) = std::env::var("INVENTRACK_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "INVENTRACK_API_URL",
    "VITE_API_URL",
    "INVENTRACK_API_TIMEOUT_SECONDS",
    "INVENTRACK_SESSION_IDLE_TIMEOUT_SECONDS",
    "INVENTRACK_SESSION_WARNING_LEAD_SECONDS",
    "INVENTRACK_SESSION_CHECK_INTERVAL_SECONDS",
    "INVENTRACK_SCANNER_IDLE_FLUSH_MS",
    "INVENTRACK_SCANNER_CHIME",
    "INVENTRACK_STORE_DRIVER",
    "INVENTRACK_STORE_PATH",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


/// Property-based tests for configuration parsing
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_session_strategy() -> impl Strategy<Value = SessionConfig> {
        (600u64..=86_400, 1u64..=300, 1u64..=600, 0u64..=10_000).prop_map(
            |(idle, lead, interval, delay)| SessionConfig {
                idle_timeout_seconds: idle,
                warning_lead_seconds: lead,
                check_interval_seconds: interval,
                renewal_failure_delay_ms: delay,
            },
        )
    }

    fn valid_scanner_strategy() -> impl Strategy<Value = ScannerConfig> {
        (1u64..=1000, 1u64..=200, 0usize..=16, any::<bool>()).prop_map(
            |(flush, burst, min, chime)| ScannerConfig {
                idle_flush_ms: flush,
                burst_interval_ms: burst,
                min_flush_length: min,
                chime,
            },
        )
    }

    fn valid_config_strategy() -> impl Strategy<Value = Config> {
        (
            "https?://[a-z]{1,12}(\\.[a-z]{2,5})?(:[0-9]{2,5})?/api",
            1u64..=120,
            valid_session_strategy(),
            valid_scanner_strategy(),
            prop_oneof![Just(StoreDriver::File), Just(StoreDriver::Memory)],
        )
            .prop_map(|(base_url, timeout, session, scanner, driver)| Config {
                api: ApiConfig {
                    base_url,
                    timeout_seconds: timeout,
                },
                session,
                scanner,
                store: StoreConfig {
                    driver,
                    path: default_store_path(),
                },
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Serializing any valid config to YAML and loading it back yields the same values.
        #[test]
        fn config_roundtrip(config in valid_config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");

            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(config.api.base_url, parsed.api.base_url);
            prop_assert_eq!(config.api.timeout_seconds, parsed.api.timeout_seconds);
            prop_assert_eq!(config.session.idle_timeout_seconds, parsed.session.idle_timeout_seconds);
            prop_assert_eq!(config.session.warning_lead_seconds, parsed.session.warning_lead_seconds);
            prop_assert_eq!(config.session.check_interval_seconds, parsed.session.check_interval_seconds);
            prop_assert_eq!(config.scanner.idle_flush_ms, parsed.scanner.idle_flush_ms);
            prop_assert_eq!(config.scanner.min_flush_length, parsed.scanner.min_flush_length);
            prop_assert_eq!(config.scanner.chime, parsed.scanner.chime);
            prop_assert_eq!(config.store.driver, parsed.store.driver);
        }

        /// Any section left out of the file falls back to its defaults.
        #[test]
        fn missing_sections_use_defaults(session in valid_session_strategy()) {
            let yaml = serde_yaml::to_string(&serde_json::json!({ "session": session }))
                .expect("Failed to serialize session");

            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(parsed.api.base_url, default_base_url());
            prop_assert_eq!(parsed.scanner.idle_flush_ms, default_idle_flush_ms());
            prop_assert_eq!(parsed.store.driver, StoreDriver::File);
            prop_assert_eq!(parsed.session.warning_lead_seconds, session.warning_lead_seconds);
        }
    }
}
