//! Grouping intervals into per-(user, project, app) appointments

pub mod aggregator;
pub mod locks;
pub mod ports;

pub use aggregator::AppointmentAggregator;
pub use locks::EntryLocks;
