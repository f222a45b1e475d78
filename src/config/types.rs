//! Configuration types.
//!
//! This module defines the library configuration struct and the logging
//! enums shared with the command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_STORE_DIR, DEFAULT_UPDATE_HOUR, DEFAULT_UPDATE_URL, FETCH_TIMEOUT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// The service never reads configuration files or environment variables
/// itself; callers fill this struct in and hand it to
/// [`CountryLookup::new`](crate::CountryLookup::new).
///
/// # Examples
///
/// ```no_run
/// use country_lookup::LookupConfig;
/// use std::path::PathBuf;
///
/// let config = LookupConfig {
///     license_key: Some("0123456789ab".to_string()),
///     store_dir: PathBuf::from("/var/lib/country_lookup"),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Credential sent to the update endpoint. Without it the service never
    /// downloads and only uses a file already present in `store_dir`.
    pub license_key: Option<String>,

    /// Directory holding the active database file and the staging file
    pub store_dir: PathBuf,

    /// Local hour (0-23) of the daily update check
    pub update_hour: u32,

    /// Base URL of the update endpoint
    pub update_url: String,

    /// Bound on a single update request
    pub fetch_timeout: Duration,
}

impl LookupConfig {
    /// Returns the license key if one is configured and non-empty.
    pub fn license_key(&self) -> Option<&str> {
        self.license_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            license_key: None,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            update_hour: DEFAULT_UPDATE_HOUR,
            update_url: DEFAULT_UPDATE_URL.to_string(),
            fetch_timeout: FETCH_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_default_config() {
        let config = LookupConfig::default();
        assert!(config.license_key.is_none());
        assert_eq!(config.store_dir, PathBuf::from(DEFAULT_STORE_DIR));
        assert_eq!(config.update_hour, 7);
        assert_eq!(config.update_url, DEFAULT_UPDATE_URL);
        assert_eq!(config.fetch_timeout, FETCH_TIMEOUT);
    }

    #[test]
    fn test_license_key_blank_is_treated_as_missing() {
        // A blank key would just produce 401s from the update endpoint
        let mut config = LookupConfig {
            license_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.license_key(), None);

        config.license_key = Some(" abc123 ".to_string());
        assert_eq!(config.license_key(), Some("abc123"));
    }
}
