//! # FocusLedger Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The sampling → coalescing → aggregation → roll-up pipeline
//! - Port/adapter interfaces (traits)
//! - In-memory adapters for every port
//!
//! ## Architecture Principles
//! - Only depends on `focusledger-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod aggregation;
pub mod classification;
pub mod memory;
pub mod summary;
pub mod sync;
pub mod tracking;

// Re-export specific items to avoid ambiguity
pub use aggregation::ports::{ProjectDirectory, TimeEntryRepository};
pub use aggregation::{AppointmentAggregator, EntryLocks};
pub use classification::ports::{ClassifierOracle, RuleStore};
pub use classification::{ClassificationResolver, KeywordClassifier, ResolutionSource};
pub use summary::ports::{NarrativeOracle, SummaryRepository};
pub use summary::{NarrativeTemplate, SummaryEngine};
pub use sync::ports::RemoteIntervalSink;
pub use sync::{AggregatorSink, IntervalSyncService, SyncReport};
pub use tracking::ports::{ActiveWindowProvider, LocalIntervalStore};
pub use tracking::{Coalescer, CoalescerConfig, Sampler, SessionRegistry, TickOutcome};
