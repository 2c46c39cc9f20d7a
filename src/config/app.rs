//! Main application configuration
//!
//! This module defines the configuration structures for the waiting-time
//! board service, including environment variable loading, TOML files and
//! validation.

use crate::display::DEFAULT_UTC_OFFSET_HOURS;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub refresh: RefreshSettings,
    pub display: DisplaySettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Background refresh settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Time between scheduled refreshes in seconds
    pub interval_seconds: u64,
    /// How long a refresh waits on the source in seconds
    pub source_timeout_seconds: u64,
    /// Age after which a kind's data is reported as stale
    pub stale_after_seconds: u64,
}

/// Board rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Offset of the board's local time from UTC
    pub utc_offset_hours: i32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "waitboard".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 10,
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 60,       // 1 minute
            source_timeout_seconds: 10, // 10 seconds
            stale_after_seconds: 180,   // 3 missed refreshes
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value lookup with fallback to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still win
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_overrides(|key| env::var(key).ok())?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Service settings
        if let Some(name) = lookup("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Refresh settings
        if let Some(interval) = lookup("REFRESH_INTERVAL_SECONDS") {
            self.refresh.interval_seconds = parse_var("REFRESH_INTERVAL_SECONDS", &interval)?;
        }
        if let Some(timeout) = lookup("SOURCE_TIMEOUT_SECONDS") {
            self.refresh.source_timeout_seconds = parse_var("SOURCE_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Some(stale) = lookup("STALE_AFTER_SECONDS") {
            self.refresh.stale_after_seconds = parse_var("STALE_AFTER_SECONDS", &stale)?;
        }

        // Display settings
        if let Some(offset) = lookup("DISPLAY_UTC_OFFSET_HOURS") {
            self.display.utc_offset_hours = parse_var("DISPLAY_UTC_OFFSET_HOURS", &offset)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_seconds)
    }

    /// Get source timeout as Duration
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.source_timeout_seconds)
    }

    /// Get staleness threshold as Duration
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.refresh.stale_after_seconds)
    }

    /// Change the refresh interval, widening the stale threshold to three intervals if needed
    pub fn set_refresh_interval(&mut self, seconds: u64) {
        self.refresh.interval_seconds = seconds;
        self.refresh.stale_after_seconds = self
            .refresh
            .stale_after_seconds
            .max(seconds.saturating_mul(3));
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.trim().is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.refresh.interval_seconds == 0 {
        return Err(anyhow!("Refresh interval must be greater than 0"));
    }
    if config.refresh.source_timeout_seconds == 0 {
        return Err(anyhow!("Source timeout must be greater than 0"));
    }
    if config.refresh.stale_after_seconds < config.refresh.interval_seconds {
        return Err(anyhow!(
            "Stale threshold ({}s) must not be shorter than the refresh interval ({}s)",
            config.refresh.stale_after_seconds,
            config.refresh.interval_seconds
        ));
    }

    // Validate display settings
    if !(-12..=14).contains(&config.display.utc_offset_hours) {
        return Err(anyhow!(
            "UTC offset must be between -12 and 14 hours, got {}",
            config.display.utc_offset_hours
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.source_timeout(), Duration::from_secs(10));
        assert_eq!(config.display.utc_offset_hours, 9);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = AppConfig::from_lookup(lookup(&[
            ("REFRESH_INTERVAL_SECONDS", "30"),
            ("LOG_LEVEL", "debug"),
            ("DISPLAY_UTC_OFFSET_HOURS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.refresh.interval_seconds, 30);
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.display.utc_offset_hours, 0);
        assert_eq!(config.service.name, "waitboard");
    }

    #[test]
    fn test_unparseable_override_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("SOURCE_TIMEOUT_SECONDS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("SOURCE_TIMEOUT_SECONDS"));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.refresh.interval_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.refresh.stale_after_seconds = 30;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.display.utc_offset_hours = 20;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [refresh]
            interval_seconds = 15
            stale_after_seconds = 45
            "#,
        )
        .unwrap();

        assert_eq!(config.refresh.interval_seconds, 15);
        assert_eq!(config.refresh.source_timeout_seconds, 10);
        assert_eq!(config.service, ServiceSettings::default());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_set_refresh_interval_widens_stale_threshold() {
        let mut config = AppConfig::default();
        config.set_refresh_interval(120);
        assert_eq!(config.refresh.interval_seconds, 120);
        assert_eq!(config.refresh.stale_after_seconds, 360);

        config.set_refresh_interval(5);
        assert_eq!(config.refresh.stale_after_seconds, 360);

        config.set_refresh_interval(u64::MAX);
        assert_eq!(config.refresh.stale_after_seconds, u64::MAX);
        assert!(validate_config(&config).is_ok());
    }
}
