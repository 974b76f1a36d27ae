//! Activity sampling, coalescing and per-session buffering

pub mod coalescer;
pub mod ports;
pub mod sampler;
pub mod session;

pub use coalescer::{Coalescer, CoalescerConfig, CoalescerState};
pub use sampler::{Sampler, TickOutcome};
pub use session::{SessionInfo, SessionRegistry, StopReport, TrackingSession};
