//! Domain types and models

pub mod activity;
pub mod appointment;
pub mod classification;
pub mod summary;
pub mod user;

pub use activity::{ActiveWindow, AppActivity, Interval, Sample, TrackedInterval};
pub use appointment::{billable_flag, Appointment, TimeEntry};
pub use classification::{
    Classification, ClassificationRule, OracleVerdict, OverrideReport, RuleSource,
};
pub use summary::{MemberReport, NarrativeSource, Summary, SummaryItem, SummaryKind};
pub use user::{Actor, Project, Role};
