//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AGENT_SAMPLE_INTERVAL_MS, DEFAULT_DB_PATH, DEFAULT_DB_POOL_SIZE,
    DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_MIN_FINAL_INTERVAL_SECS, DEFAULT_NOISE_THRESHOLD_SECS,
    DEFAULT_ORACLE_MODEL, DEFAULT_ORACLE_TIMEOUT_SECS, DEFAULT_ORACLE_URL,
    DEFAULT_PREVIEW_SAMPLE_INTERVAL_MS, DEFAULT_SUMMARY_CRON, DEFAULT_SYNC_INTERVAL_SECS,
    DEFAULT_TOP_APPS,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

/// Activity sampling and coalescing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Sampling cadence for desktop agents.
    pub sample_interval_ms: u64,
    /// Sampling cadence for the UI preview.
    pub preview_sample_interval_ms: u64,
    /// Intervals at or below this duration are discarded as focus flicker.
    pub noise_threshold_secs: f64,
    /// Minimum duration for the in-progress interval to survive a stop.
    pub min_final_interval_secs: f64,
    /// How often buffered intervals are re-flushed to local storage.
    pub flush_interval_secs: u64,
}

impl TrackingConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn preview_sample_interval(&self) -> Duration {
        Duration::from_millis(self.preview_sample_interval_ms.max(1))
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_AGENT_SAMPLE_INTERVAL_MS,
            preview_sample_interval_ms: DEFAULT_PREVIEW_SAMPLE_INTERVAL_MS,
            noise_threshold_secs: DEFAULT_NOISE_THRESHOLD_SECS,
            min_final_interval_secs: DEFAULT_MIN_FINAL_INTERVAL_SECS,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
        }
    }
}

/// Agent-to-backend sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_seconds: u64,
    pub enabled: bool,
    /// Remote endpoint receiving tracked intervals. `None` delivers in-process.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_seconds: DEFAULT_SYNC_INTERVAL_SECS, enabled: true, endpoint: None }
    }
}

/// Classification / narrative oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Absent key means the deterministic fallback is used for the whole run.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl OracleConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_ORACLE_MODEL.to_string(),
            api_url: DEFAULT_ORACLE_URL.to_string(),
            timeout_secs: DEFAULT_ORACLE_TIMEOUT_SECS,
        }
    }
}

/// Roll-up configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Cron expression (with seconds) for the nightly roll-up job.
    pub cron_expression: String,
    /// Number of apps listed in fallback narratives.
    pub top_apps: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { cron_expression: DEFAULT_SUMMARY_CRON.to_string(), top_apps: DEFAULT_TOP_APPS }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}
