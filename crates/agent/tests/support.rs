#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use focusledger_agent::AppContext;
use focusledger_core::ActiveWindowProvider;
use focusledger_domain::{ActiveWindow, Config, DatabaseConfig, Result, Sample};
use tempfile::TempDir;

/// Context over a throwaway database. Keep the `TempDir` alive for the
/// lifetime of the context.
pub fn create_test_context() -> (AppContext, TempDir) {
    create_test_context_with(|_| {})
}

pub fn create_test_context_with(customize: impl FnOnce(&mut Config)) -> (AppContext, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temporary test directory");
    let mut config = Config {
        database: DatabaseConfig {
            path: temp_dir.path().join("data").join("ledger.db").to_string_lossy().into_owned(),
            pool_size: 4,
        },
        ..Config::default()
    };
    config.oracle.api_key = None;
    config.sync.endpoint = None;
    customize(&mut config);

    let ctx = AppContext::new(config).expect("context should initialise");
    (ctx, temp_dir)
}

pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, second).unwrap()
}

/// Samples for a morning: ten minutes in the editor, then five in mail.
pub fn morning_samples() -> Vec<Sample> {
    let start = at(9, 0, 0);
    vec![
        Sample::new(start, "main.rs - Code", "Code"),
        Sample::new(start + Duration::seconds(300), "main.rs - Code", "Code"),
        Sample::new(start + Duration::seconds(600), "Inbox - Mail", "Mail"),
        Sample::new(start + Duration::seconds(900), "Inbox - Mail", "Mail"),
    ]
}

/// Reports the same editor window on every poll and counts the polls.
#[derive(Default)]
pub struct ScriptedWindow {
    pub polls: AtomicUsize,
}

#[async_trait]
impl ActiveWindowProvider for ScriptedWindow {
    async fn active_window(&self) -> Result<Option<ActiveWindow>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(ActiveWindow { title: "main.rs - Code".into(), owner_process_name: "Code".into() }))
    }
}
