//! # FocusLedger agent
//!
//! Application layer - commands, dependency wiring and the `focusledger`
//! binary.
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - [`AppContext`] wires the SQLite adapters, oracle client and schedulers
//!   into the core services
//! - [`commands`] exposes each operation as a timed, logged async function

pub mod commands;
pub mod context;
pub mod utils;

pub use commands::*;
pub use context::AppContext;
