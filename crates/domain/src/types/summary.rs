//! Roll-up summaries

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryKind {
    DailyUser,
    Manager,
}

impl_label_conversions!(SummaryKind {
    DailyUser => "daily-user",
    Manager => "manager",
});

/// Where a summary's narrative text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    Oracle,
    Template,
}

/// Aggregated usage of one app within a summary window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub app_name: String,
    pub total_seconds: f64,
    pub billable_seconds: f64,
    pub interval_count: usize,
}

/// One member's daily-user shaped report inside a manager summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberReport {
    pub user_id: String,
    pub text: String,
    pub items: Vec<SummaryItem>,
    pub total_seconds: f64,
    pub billable_seconds: f64,
}

/// At most one per `(kind, subject_id, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub kind: SummaryKind,
    pub date: NaiveDate,
    /// User id for daily-user summaries, project id for manager summaries.
    pub subject_id: String,
    pub text: String,
    pub narrative_source: NarrativeSource,
    pub items: Vec<SummaryItem>,
    pub member_reports: Option<Vec<MemberReport>>,
    pub generated_at: DateTime<Utc>,
}

impl Summary {
    pub fn key(&self) -> (SummaryKind, &str, NaiveDate) {
        (self.kind, self.subject_id.as_str(), self.date)
    }

    pub fn total_seconds(&self) -> f64 {
        self.items.iter().map(|i| i.total_seconds).sum()
    }

    pub fn billable_seconds(&self) -> f64 {
        self.items.iter().map(|i| i.billable_seconds).sum()
    }
}
