//! Background task scheduling
//!
//! - Sampling loop (one per tracking session, fixed cadence)
//! - Sync scheduler (local store → remote sink, fixed interval)
//! - Summary scheduler (nightly roll-up, cron)
//!
//! All schedulers share the same lifecycle rules:
//! - Explicit `start` / `stop`
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on stop and on each job run

pub mod error;
pub mod sampling_loop;
pub mod summary_scheduler;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sampling_loop::{SamplingLoop, SamplingLoopConfig};
pub use summary_scheduler::{
    NightlyRollup, RollupReport, SummaryJob, SummaryScheduler, SummarySchedulerConfig,
};
pub use sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
