//! SQLite implementations of the persistence ports

pub mod interval_store;
pub mod manager;
pub mod project_repository;
pub mod rule_repository;
pub mod summary_repository;
pub mod time_entry_repository;

use chrono::{DateTime, Utc};
use focusledger_domain::{LedgerError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task;

pub use interval_store::SqlIntervalStore;
pub use manager::{DbManager, SqliteConnection, SqlitePool};
pub use project_repository::SqlProjectDirectory;
pub use rule_repository::SqlRuleStore;
pub use summary_repository::SqlSummaryRepository;
pub use time_entry_repository::SqlTimeEntryRepository;

use crate::errors::InfraError;

fn map_join_error(err: task::JoinError) -> LedgerError {
    InfraError::from(err).into()
}

fn encode_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|err| InfraError::from(err).into())
}

fn decode_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|err| LedgerError::Database(format!("corrupt {column} document: {err}")))
}

fn from_millis(column: &str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| LedgerError::Database(format!("{column} out of range: {millis}")))
}

fn parse_label<T>(column: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|err| LedgerError::Database(format!("{column}: {err}")))
}
