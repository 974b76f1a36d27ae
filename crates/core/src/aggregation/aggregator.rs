//! Appointment aggregation
//!
//! Folds finalized intervals into the owning `(user, project)` time entry.
//! An appointment stays open for appending while the normalized app key and
//! the batch date (UTC day of the interval start) match.

use std::sync::Arc;

use chrono::Utc;
use focusledger_domain::{
    normalize_app_name, AppActivity, Appointment, Interval, LedgerError, Result, TimeEntry,
};
use tracing::debug;

use super::locks::EntryLocks;
use super::ports::{ProjectDirectory, TimeEntryRepository};
use crate::classification::ClassificationResolver;

pub struct AppointmentAggregator {
    entries: Arc<dyn TimeEntryRepository>,
    projects: Arc<dyn ProjectDirectory>,
    resolver: Arc<ClassificationResolver>,
    locks: Arc<EntryLocks>,
}

impl AppointmentAggregator {
    /// `locks` must be the same set the resolver re-stamps under.
    pub fn new(
        entries: Arc<dyn TimeEntryRepository>,
        projects: Arc<dyn ProjectDirectory>,
        resolver: Arc<ClassificationResolver>,
        locks: Arc<EntryLocks>,
    ) -> Self {
        Self { entries, projects, resolver, locks }
    }

    /// Appends the interval to the open appointment for its app, or opens a
    /// new one (classifying it once). Persists the owning time entry.
    ///
    /// Re-delivering an interval already present is a no-op apart from the
    /// billable flag being refreshed.
    pub async fn record_appointment(
        &self,
        user_id: &str,
        project_id: &str,
        task_id: Option<String>,
        interval: Interval,
    ) -> Result<Appointment> {
        if user_id.trim().is_empty() || project_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "an appointment needs both a user and a project".to_string(),
            ));
        }
        if interval.end_time < interval.start_time {
            return Err(LedgerError::InvalidInput("interval ends before it starts".to_string()));
        }

        let activity = AppActivity::from(&interval);
        let app_key = normalize_app_name(activity.identifier());
        let batch_date = interval.batch_date();

        let _guard = self.locks.lock(user_id, project_id).await;

        let mut entry = self
            .entries
            .find_entry(user_id, project_id)
            .await?
            .unwrap_or_else(|| TimeEntry::new(user_id, project_id));
        let project_billable = self.projects.is_project_billable(project_id).await?;

        let appointment = match entry.open_appointment_mut(&app_key, batch_date) {
            Some(open) => {
                if open.contains_interval(&interval) {
                    debug!(user_id, project_id, app = %app_key, "interval already recorded");
                } else {
                    open.push_interval(interval);
                }
                if open.task_id.is_none() {
                    open.task_id = task_id;
                }
                let category = open.suggested_category;
                open.restamp(category, project_billable);
                open.clone()
            }
            None => {
                let category = self.resolver.resolve(&activity).await;
                let created =
                    Appointment::new(app_key.clone(), task_id, interval, category, project_billable);
                entry.appointments.push(created.clone());
                debug!(user_id, project_id, app = %app_key, category = %category, "appointment opened");
                created
            }
        };

        entry.updated_at = Utc::now();
        self.entries.upsert_entry(&entry).await?;
        Ok(appointment)
    }

    /// Records intervals in order, stopping at the first failure.
    pub async fn record_batch(
        &self,
        user_id: &str,
        project_id: &str,
        task_id: Option<String>,
        intervals: Vec<Interval>,
    ) -> Result<Vec<Appointment>> {
        let mut appointments = Vec::with_capacity(intervals.len());
        for interval in intervals {
            appointments
                .push(self.record_appointment(user_id, project_id, task_id.clone(), interval).await?);
        }
        Ok(appointments)
    }
}
