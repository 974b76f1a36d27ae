//! Command layer
//!
//! Thin async entry points over [`AppContext`](crate::AppContext). Each
//! command is timed and logged through
//! [`execute_command`](crate::utils::command_helpers::execute_command).

pub mod appointments;
pub mod classification;
pub mod projects;
pub mod summaries;
pub mod sync;
pub mod tracking;

pub use appointments::record_appointment;
pub use classification::{
    delete_classification_rule, list_classification_rules, override_classification,
    resolve_classification,
};
pub use projects::{add_project_member, remove_project_member, upsert_project};
pub use summaries::{build_daily_summary, build_manager_summary, get_summary};
pub use sync::sync_now;
pub use tracking::{start_sampling, start_session, stop_session, submit_sample};
