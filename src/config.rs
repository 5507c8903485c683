//! Configuration management for the listing augmenter

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiet period after the last tree mutation before a scan flush, in milliseconds
    pub scan_debounce_ms: u64,

    /// Quiet period after an overlay signal before visibility is recomputed, in milliseconds
    pub overlay_debounce_ms: u64,

    /// Interval between lookups for a not-yet-present overlay panel, in milliseconds
    pub overlay_poll_ms: u64,

    /// Dirty roots accumulated before collapsing into a full rescan
    pub max_dirty_roots: usize,

    /// Smallest decoded `data:` image accepted as a real thumbnail, in bytes
    pub min_inline_image_bytes: usize,

    /// How long the added/failed state stays on a control, in milliseconds
    pub success_flash_ms: u64,

    /// Timeout for thumbnail fetches, in milliseconds
    pub fetch_timeout_ms: u64,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_debounce_ms: 250,
            overlay_debounce_ms: 50,
            overlay_poll_ms: 1000,
            max_dirty_roots: 80,
            min_inline_image_bytes: 1024,
            success_flash_ms: 1500,
            fetch_timeout_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(debounce) = env::var("AUGMENT_SCAN_DEBOUNCE_MS") {
            config.scan_debounce_ms = debounce
                .parse()
                .map_err(|_| Error::configuration("Invalid AUGMENT_SCAN_DEBOUNCE_MS"))?;
        }

        if let Ok(debounce) = env::var("AUGMENT_OVERLAY_DEBOUNCE_MS") {
            config.overlay_debounce_ms = debounce
                .parse()
                .map_err(|_| Error::configuration("Invalid AUGMENT_OVERLAY_DEBOUNCE_MS"))?;
        }

        if let Ok(poll) = env::var("AUGMENT_OVERLAY_POLL_MS") {
            config.overlay_poll_ms = poll
                .parse()
                .map_err(|_| Error::configuration("Invalid AUGMENT_OVERLAY_POLL_MS"))?;
        }

        if let Ok(max_roots) = env::var("AUGMENT_MAX_DIRTY_ROOTS") {
            config.max_dirty_roots = max_roots
                .parse()
                .map_err(|_| Error::configuration("Invalid AUGMENT_MAX_DIRTY_ROOTS"))?;
        }

        if let Ok(min_bytes) = env::var("AUGMENT_MIN_INLINE_IMAGE_BYTES") {
            config.min_inline_image_bytes = min_bytes
                .parse()
                .map_err(|_| Error::configuration("Invalid AUGMENT_MIN_INLINE_IMAGE_BYTES"))?;
        }

        if let Ok(flash) = env::var("AUGMENT_SUCCESS_FLASH_MS") {
            config.success_flash_ms = flash
                .parse()
                .map_err(|_| Error::configuration("Invalid AUGMENT_SUCCESS_FLASH_MS"))?;
        }

        if let Ok(timeout) = env::var("AUGMENT_FETCH_TIMEOUT_MS") {
            config.fetch_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid AUGMENT_FETCH_TIMEOUT_MS"))?;
        }

        if let Ok(log_level) = env::var("AUGMENT_LOG_LEVEL") {
            config.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_dirty_roots == 0 {
            return Err(Error::configuration("max_dirty_roots must be at least 1"));
        }
        if self.overlay_poll_ms == 0 {
            return Err(Error::configuration("overlay_poll_ms must be positive"));
        }
        Ok(())
    }

    pub fn scan_debounce(&self) -> Duration {
        Duration::from_millis(self.scan_debounce_ms)
    }

    pub fn overlay_debounce(&self) -> Duration {
        Duration::from_millis(self.overlay_debounce_ms)
    }

    pub fn overlay_poll(&self) -> Duration {
        Duration::from_millis(self.overlay_poll_ms)
    }

    pub fn success_flash(&self) -> Duration {
        Duration::from_millis(self.success_flash_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
