//! Agent-side delivery of tracked intervals

pub mod aggregator_sink;
pub mod ports;
pub mod service;

pub use aggregator_sink::AggregatorSink;
pub use service::{IntervalSyncService, SyncReport};
