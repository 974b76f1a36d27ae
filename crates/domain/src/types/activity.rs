//! Activity telemetry: raw samples and the intervals coalesced from them

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};

/// What the OS reports as the focused window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub title: String,
    pub owner_process_name: String,
}

/// A point-in-time observation of the focused window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub window_title: String,
    pub process_name: String,
}

impl Sample {
    pub fn new(
        timestamp: DateTime<Utc>,
        window_title: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Self {
        Self { timestamp, window_title: window_title.into(), process_name: process_name.into() }
    }

    pub fn from_window(window: ActiveWindow, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, window_title: window.title, process_name: window.owner_process_name }
    }

    /// A sample that carries neither a title nor a process name.
    pub fn is_blank(&self) -> bool {
        self.window_title.trim().is_empty() && self.process_name.trim().is_empty()
    }
}

/// A single contiguous span of focus on one application window.
///
/// `duration_seconds` is always derived from `start_time`/`end_time` and is
/// recomputed on every extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub app_title: String,
    pub app_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl Interval {
    /// Zero-length interval starting at `at`.
    pub fn open(app_title: impl Into<String>, app_name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            app_title: app_title.into(),
            app_name: app_name.into(),
            start_time: at,
            end_time: at,
            duration_seconds: 0.0,
        }
    }

    /// Builds a closed interval, rejecting `end < start`.
    pub fn new(
        app_title: impl Into<String>,
        app_name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self> {
        if end_time < start_time {
            return Err(LedgerError::InvalidInput(format!(
                "interval ends before it starts ({end_time} < {start_time})"
            )));
        }
        let mut interval = Self::open(app_title, app_name, start_time);
        interval.end_time = end_time;
        interval.recompute();
        Ok(interval)
    }

    /// Moves `end_time` forward. Time never moves backwards.
    pub fn extend_to(&mut self, at: DateTime<Utc>) -> Result<()> {
        if at < self.end_time {
            return Err(LedgerError::InvalidInput(format!(
                "cannot extend interval backwards ({at} < {})",
                self.end_time
            )));
        }
        self.end_time = at;
        self.recompute();
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// The sync batch this interval belongs to (UTC day of its start).
    pub fn batch_date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    /// Whether the interval falls (by start time) inside `[from, to)`.
    pub fn starts_within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start_time >= from && self.start_time < to
    }

    fn recompute(&mut self) {
        self.duration_seconds = self.duration().num_milliseconds() as f64 / 1000.0;
    }
}

/// The activity handed to the classification resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppActivity {
    pub app_name: String,
    pub app_title: String,
}

impl AppActivity {
    pub fn new(app_name: impl Into<String>, app_title: impl Into<String>) -> Self {
        Self { app_name: app_name.into(), app_title: app_title.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.app_name.trim().is_empty() && self.app_title.trim().is_empty()
    }

    /// The identifier the rule cache is keyed on: the app name, or the title
    /// when no name was captured.
    pub fn identifier(&self) -> &str {
        if self.app_name.trim().is_empty() {
            &self.app_title
        } else {
            &self.app_name
        }
    }
}

impl From<&Interval> for AppActivity {
    fn from(interval: &Interval) -> Self {
        Self::new(interval.app_name.clone(), interval.app_title.clone())
    }
}

/// A finalized interval waiting in the agent's local store for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedInterval {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: String,
    pub project_id: String,
    pub task_id: Option<String>,
    pub interval: Interval,
    pub recorded_at: DateTime<Utc>,
}
