//! # FocusLedger Domain
//!
//! Business domain types and models for FocusLedger.
//!
//! This crate contains:
//! - Domain data types (Sample, Interval, Appointment, Summary, ...)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and the app-name normalizer
//!
//! ## Architecture
//! - No dependencies on other FocusLedger crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::normalize::normalize_app_name;
