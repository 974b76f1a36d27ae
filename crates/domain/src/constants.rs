//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Coalescing
pub const DEFAULT_NOISE_THRESHOLD_SECS: f64 = 2.0;
pub const DEFAULT_MIN_FINAL_INTERVAL_SECS: f64 = 2.0;
pub const DEFAULT_AGENT_SAMPLE_INTERVAL_MS: u64 = 200;
pub const DEFAULT_PREVIEW_SAMPLE_INTERVAL_MS: u64 = 100;
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;

// Normalization
pub const UNKNOWN_APP_KEY: &str = "unknown";
pub const EXECUTABLE_SUFFIXES: &[&str] = &[".exe", ".app", ".appimage", ".bin", ".desktop"];

// Sync
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

// Roll-ups
pub const DEFAULT_TOP_APPS: usize = 5;
pub const DEFAULT_SUMMARY_CRON: &str = "0 5 0 * * *";

// Database
pub const DEFAULT_DB_PATH: &str = "focusledger.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;

// Oracle
pub const DEFAULT_ORACLE_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ORACLE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 20;
