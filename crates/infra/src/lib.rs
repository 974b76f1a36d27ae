//! # FocusLedger Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite repositories behind an r2d2 pool
//! - HTTP client with retry, remote interval sink
//! - OpenAI classification and narrative oracle
//! - Schedulers for sampling, sync and the nightly roll-up
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `focusledger-core`
//! - Contains all "impure" code (I/O, network, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod scheduling;
pub mod sync;

pub use database::{
    DbManager, SqlIntervalStore, SqlProjectDirectory, SqlRuleStore, SqlSummaryRepository,
    SqlTimeEntryRepository,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::openai::OpenAIClient;
pub use sync::HttpIntervalSink;
