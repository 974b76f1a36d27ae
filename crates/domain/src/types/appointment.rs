//! Appointments and the per-(user, project) time entries that own them

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::activity::Interval;
use super::classification::Classification;

/// `is_billable` is the AND of the activity classification and the project's
/// billable flag, never one of them alone.
pub fn billable_flag(category: Classification, project_billable: bool) -> bool {
    category.is_billable() && project_billable
}

/// Grouped usage of one app by one user on one project within one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub app_title: String,
    /// Normalized app key.
    pub app_name: String,
    pub task_id: Option<String>,
    pub suggested_category: Classification,
    pub is_billable: bool,
    pub time_intervals: Vec<Interval>,
    pub batch_date: NaiveDate,
}

impl Appointment {
    pub fn new(
        app_name: impl Into<String>,
        task_id: Option<String>,
        interval: Interval,
        suggested_category: Classification,
        project_billable: bool,
    ) -> Self {
        Self {
            app_title: interval.app_title.clone(),
            app_name: app_name.into(),
            task_id,
            suggested_category,
            is_billable: billable_flag(suggested_category, project_billable),
            batch_date: interval.batch_date(),
            time_intervals: vec![interval],
        }
    }

    pub fn is_open_for(&self, app_key: &str, batch_date: NaiveDate) -> bool {
        self.app_name == app_key && self.batch_date == batch_date
    }

    /// Same span already recorded (at-least-once redelivery).
    pub fn contains_interval(&self, interval: &Interval) -> bool {
        self.time_intervals
            .iter()
            .any(|i| i.start_time == interval.start_time && i.end_time == interval.end_time)
    }

    pub fn push_interval(&mut self, interval: Interval) {
        self.app_title = interval.app_title.clone();
        self.time_intervals.push(interval);
    }

    /// Re-applies the billable rule with a (possibly new) category and the
    /// project's current flag. Returns whether anything changed.
    pub fn restamp(&mut self, category: Classification, project_billable: bool) -> bool {
        let billable = billable_flag(category, project_billable);
        let changed = self.suggested_category != category || self.is_billable != billable;
        self.suggested_category = category;
        self.is_billable = billable;
        changed
    }

    pub fn total_seconds(&self) -> f64 {
        self.time_intervals.iter().map(|i| i.duration_seconds).sum()
    }

    /// Intervals starting in `[from, to)`.
    pub fn intervals_within(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &Interval> {
        self.time_intervals.iter().filter(move |i| i.starts_within(from, to))
    }
}

/// All appointments of one user on one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub user_id: String,
    pub project_id: String,
    pub appointments: Vec<Appointment>,
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    pub fn new(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            project_id: project_id.into(),
            appointments: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn open_appointment_mut(
        &mut self,
        app_key: &str,
        batch_date: NaiveDate,
    ) -> Option<&mut Appointment> {
        self.appointments.iter_mut().find(|a| a.is_open_for(app_key, batch_date))
    }

    pub fn has_app(&self, app_key: &str) -> bool {
        self.appointments.iter().any(|a| a.app_name == app_key)
    }

    /// Distinct app keys, used for indexing.
    pub fn app_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.appointments.iter().map(|a| a.app_name.clone()).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Restamps every appointment for `app_key`. Returns whether any changed.
    pub fn restamp_app(
        &mut self,
        app_key: &str,
        category: Classification,
        project_billable: bool,
    ) -> bool {
        let mut changed = false;
        for appointment in self.appointments.iter_mut().filter(|a| a.app_name == app_key) {
            changed |= appointment.restamp(category, project_billable);
        }
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }
}
