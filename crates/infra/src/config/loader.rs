//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `FOCUSLEDGER_DB_PATH` is set, configuration comes from the
//!    environment (unset variables keep their defaults)
//! 2. Otherwise searches for a config file (JSON or TOML)
//! 3. Otherwise built-in defaults
//! 4. The oracle key is always taken from the environment when present
//!
//! ## Environment Variables
//! - `FOCUSLEDGER_DB_PATH`: Database file path
//! - `FOCUSLEDGER_DB_POOL_SIZE`: Connection pool size
//! - `FOCUSLEDGER_SAMPLE_INTERVAL_MS`: Agent sampling cadence
//! - `FOCUSLEDGER_NOISE_THRESHOLD_SECS`: Flicker threshold
//! - `FOCUSLEDGER_MIN_FINAL_INTERVAL_SECS`: Minimum final interval on stop
//! - `FOCUSLEDGER_FLUSH_INTERVAL_SECS`: Local-store flush cadence
//! - `FOCUSLEDGER_SYNC_INTERVAL`: Sync interval in seconds
//! - `FOCUSLEDGER_SYNC_ENABLED`: Whether sync is enabled (true/false)
//! - `FOCUSLEDGER_SYNC_ENDPOINT`: Remote interval endpoint
//! - `FOCUSLEDGER_ORACLE_API_KEY` (alias `OPENAI_API_KEY`): Oracle key
//! - `FOCUSLEDGER_ORACLE_MODEL`: Oracle model name
//! - `FOCUSLEDGER_ORACLE_URL`: Chat completions endpoint
//! - `FOCUSLEDGER_SUMMARY_CRON`: Nightly roll-up schedule
//! - `FOCUSLEDGER_LOG_FORMAT`: `pretty` or `json`
//!
//! ## File Locations
//! The loader checks the following paths (in order):
//! 1. `./config.{toml,json}` then `./focusledger.{toml,json}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use focusledger_domain::{Config, LedgerError, LogFormat, Result};

const FILE_STEMS: [&str; 2] = ["config", "focusledger"];
const FILE_EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `LedgerError::Config` if a present source is invalid. A missing
/// config file is not an error.
pub fn load() -> Result<Config> {
    let mut config = if std::env::var_os("FOCUSLEDGER_DB_PATH").is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        config
    } else {
        match discover_config_path() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::debug!("No config file found; using defaults");
                Config::default()
            }
        }
    };

    apply_oracle_key(&mut config);
    Ok(config)
}

/// Load configuration from environment variables
///
/// `FOCUSLEDGER_DB_PATH` is required; everything else falls back to the
/// defaults.
///
/// # Errors
/// Returns `LedgerError::Config` if the database path is missing or a value
/// does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("FOCUSLEDGER_DB_PATH")?;
    if let Some(size) = env_parse("FOCUSLEDGER_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }

    if let Some(ms) = env_parse("FOCUSLEDGER_SAMPLE_INTERVAL_MS")? {
        config.tracking.sample_interval_ms = ms;
    }
    if let Some(secs) = env_parse("FOCUSLEDGER_NOISE_THRESHOLD_SECS")? {
        config.tracking.noise_threshold_secs = secs;
    }
    if let Some(secs) = env_parse("FOCUSLEDGER_MIN_FINAL_INTERVAL_SECS")? {
        config.tracking.min_final_interval_secs = secs;
    }
    if let Some(secs) = env_parse("FOCUSLEDGER_FLUSH_INTERVAL_SECS")? {
        config.tracking.flush_interval_secs = secs;
    }

    if let Some(secs) = env_parse("FOCUSLEDGER_SYNC_INTERVAL")? {
        config.sync.interval_seconds = secs;
    }
    config.sync.enabled = env_bool("FOCUSLEDGER_SYNC_ENABLED", config.sync.enabled);
    config.sync.endpoint = env_opt("FOCUSLEDGER_SYNC_ENDPOINT");

    if let Some(model) = env_opt("FOCUSLEDGER_ORACLE_MODEL") {
        config.oracle.model = model;
    }
    if let Some(url) = env_opt("FOCUSLEDGER_ORACLE_URL") {
        config.oracle.api_url = url;
    }

    if let Some(cron) = env_opt("FOCUSLEDGER_SUMMARY_CRON") {
        config.summary.cron_expression = cron;
    }

    if let Some(format) = env_opt("FOCUSLEDGER_LOG_FORMAT") {
        config.logging.format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            other => {
                return Err(LedgerError::Config(format!("Invalid log format: {other}")));
            }
        };
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations.
///
/// # Errors
/// Returns `LedgerError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LedgerError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => discover_config_path().ok_or_else(|| {
            LedgerError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LedgerError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| LedgerError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| LedgerError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(LedgerError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn discover_config_path() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    search_roots(&roots)
}

fn search_roots(roots: &[PathBuf]) -> Option<PathBuf> {
    roots
        .iter()
        .flat_map(|root| {
            FILE_STEMS.iter().flat_map(move |stem| {
                FILE_EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .find(|path| path.exists())
}

/// The environment wins over a key from a file.
fn apply_oracle_key(config: &mut Config) {
    if let Some(key) = env_opt("FOCUSLEDGER_ORACLE_API_KEY").or_else(|| env_opt("OPENAI_API_KEY")) {
        config.oracle.api_key = Some(key);
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        LedgerError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| LedgerError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
