//! Summary roll-up engine
//!
//! Builds daily-user and manager summaries from recorded appointments and
//! upserts them keyed by `(kind, subject, date)`, so re-running a day
//! replaces rather than duplicates. A narrative oracle outage only changes
//! the text source. A failed write keeps the computed summary in a pending
//! buffer for [`SummaryEngine::retry_pending_writes`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use focusledger_domain::{
    LedgerError, MemberReport, NarrativeSource, Result, Summary, SummaryItem, SummaryKind,
    TimeEntry,
};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use super::ports::{NarrativeOracle, SummaryRepository};
use super::template::NarrativeTemplate;
use crate::aggregation::ports::{ProjectDirectory, TimeEntryRepository};

const DEFAULT_NARRATIVE_TIMEOUT: Duration = Duration::from_secs(30);

type SummaryKey = (SummaryKind, String, NaiveDate);

pub struct SummaryEngine {
    entries: Arc<dyn TimeEntryRepository>,
    projects: Arc<dyn ProjectDirectory>,
    summaries: Arc<dyn SummaryRepository>,
    narrator: Option<Arc<dyn NarrativeOracle>>,
    template: NarrativeTemplate,
    narrative_timeout: Duration,
    /// Set after the narrator reports a configuration failure; the template
    /// is used for the rest of the run.
    narrator_disabled: AtomicBool,
    pending: Mutex<HashMap<SummaryKey, Summary>>,
}

impl SummaryEngine {
    pub fn new(
        entries: Arc<dyn TimeEntryRepository>,
        projects: Arc<dyn ProjectDirectory>,
        summaries: Arc<dyn SummaryRepository>,
    ) -> Self {
        Self {
            entries,
            projects,
            summaries,
            narrator: None,
            template: NarrativeTemplate::default(),
            narrative_timeout: DEFAULT_NARRATIVE_TIMEOUT,
            narrator_disabled: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeOracle>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn with_template(mut self, template: NarrativeTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_narrative_timeout(mut self, timeout: Duration) -> Self {
        self.narrative_timeout = timeout;
        self
    }

    pub async fn build_daily_summary(&self, user_id: &str, date: NaiveDate) -> Result<Summary> {
        if user_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("user id is required".to_string()));
        }
        let report = self.member_report(user_id, date, None).await?;
        let summary = Summary {
            kind: SummaryKind::DailyUser,
            date,
            subject_id: user_id.to_string(),
            text: report.text,
            narrative_source: report.source,
            items: report.items,
            member_reports: None,
            generated_at: Utc::now(),
        };
        self.persist(summary).await
    }

    /// Member reports are built concurrently and restricted to this project.
    pub async fn build_manager_summary(&self, project_id: &str, date: NaiveDate) -> Result<Summary> {
        if project_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("project id is required".to_string()));
        }
        let project_name = self
            .projects
            .project_name(project_id)
            .await?
            .unwrap_or_else(|| project_id.to_string());
        let mut members = self.projects.project_members(project_id).await?;
        members.sort();
        members.dedup();

        let built = join_all(
            members.iter().map(|member| self.member_report(member, date, Some(project_id))),
        )
        .await;

        let mut reports = Vec::with_capacity(built.len());
        for (member, report) in members.iter().zip(built) {
            let report = report?;
            reports.push(MemberReport {
                user_id: member.clone(),
                total_seconds: report.items.iter().map(|i| i.total_seconds).sum(),
                billable_seconds: report.items.iter().map(|i| i.billable_seconds).sum(),
                text: report.text,
                items: report.items,
            });
        }

        let items = merge_items(reports.iter().flat_map(|r| r.items.iter()));
        let (text, narrative_source) = match self.oracle_narrative(&items, &project_name, date).await
        {
            Some(text) => (text, NarrativeSource::Oracle),
            None => (self.template.team(&project_name, date, &items, &reports), NarrativeSource::Template),
        };

        let summary = Summary {
            kind: SummaryKind::Manager,
            date,
            subject_id: project_id.to_string(),
            text,
            narrative_source,
            items,
            member_reports: Some(reports),
            generated_at: Utc::now(),
        };
        self.persist(summary).await
    }

    pub async fn find_summary(
        &self,
        kind: SummaryKind,
        subject_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Summary>> {
        self.summaries.find_summary(kind, subject_id, date).await
    }

    /// Re-attempts writes that failed earlier. Returns how many landed;
    /// failures stay buffered. A buffered summary older than what the store
    /// already holds is dropped instead of written.
    pub async fn retry_pending_writes(&self) -> Result<usize> {
        let pending: Vec<(SummaryKey, Summary)> =
            self.pending.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut written = 0;
        let mut last_error = None;
        for (key, summary) in pending {
            if !self.still_pending(&key, &summary) {
                continue;
            }
            match self.summaries.find_summary(key.0, &key.1, key.2).await {
                Ok(Some(stored)) if stored.generated_at >= summary.generated_at => {
                    self.clear_pending(&key, &summary);
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(kind = %key.0, subject = %key.1, date = %key.2, error = %err, "could not check stored summary before retry");
                    last_error = Some(err);
                    continue;
                }
            }
            match self.summaries.upsert_summary(&summary).await {
                Ok(()) => {
                    self.clear_pending(&key, &summary);
                    written += 1;
                }
                Err(err) => {
                    warn!(kind = %key.0, subject = %key.1, date = %key.2, error = %err, "pending summary write failed again");
                    last_error = Some(err);
                }
            }
        }
        match last_error {
            Some(err) if written == 0 => Err(err),
            _ => Ok(written),
        }
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.lock().len()
    }

    async fn persist(&self, summary: Summary) -> Result<Summary> {
        let key = (summary.kind, summary.subject_id.clone(), summary.date);
        match self.summaries.upsert_summary(&summary).await {
            Ok(()) => {
                self.pending.lock().remove(&key);
                info!(kind = %summary.kind, subject = %summary.subject_id, date = %summary.date, source = ?summary.narrative_source, "summary stored");
                Ok(summary)
            }
            Err(err) => {
                warn!(kind = %summary.kind, subject = %summary.subject_id, date = %summary.date, error = %err, "summary write failed; kept for retry");
                self.pending.lock().insert(key, summary);
                Err(err)
            }
        }
    }

    fn still_pending(&self, key: &SummaryKey, summary: &Summary) -> bool {
        self.pending.lock().get(key).is_some_and(|p| p.generated_at == summary.generated_at)
    }

    /// Removes `key` only if the buffer still holds this exact snapshot.
    fn clear_pending(&self, key: &SummaryKey, summary: &Summary) {
        let mut pending = self.pending.lock();
        if pending.get(key).is_some_and(|p| p.generated_at == summary.generated_at) {
            pending.remove(key);
        }
    }

    async fn member_report(
        &self,
        user_id: &str,
        date: NaiveDate,
        project_id: Option<&str>,
    ) -> Result<DraftReport> {
        let entries = self.entries.entries_for_user(user_id).await?;
        let (from, to) = day_bounds(date);
        let items = collect_items(
            entries.iter().filter(|e| project_id.map_or(true, |p| e.project_id == p)),
            from,
            to,
        );
        let (text, source) = match self.oracle_narrative(&items, user_id, date).await {
            Some(text) => (text, NarrativeSource::Oracle),
            None => (self.template.daily(user_id, date, &items), NarrativeSource::Template),
        };
        Ok(DraftReport { items, text, source })
    }

    async fn oracle_narrative(
        &self,
        items: &[SummaryItem],
        subject: &str,
        date: NaiveDate,
    ) -> Option<String> {
        if self.narrator_disabled.load(Ordering::Relaxed) {
            return None;
        }
        let narrator = self.narrator.as_ref()?;
        let call = narrator.summarize(items, subject, date);
        match tokio::time::timeout(self.narrative_timeout, call).await {
            Ok(Ok(Some(text))) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => None,
            Ok(Err(LedgerError::Config(reason))) => {
                if !self.narrator_disabled.swap(true, Ordering::Relaxed) {
                    error!(reason = %reason, "narrative oracle misconfigured; using template for this run");
                }
                None
            }
            Ok(Err(err)) => {
                warn!(subject, error = %err, "narrative oracle failed; using template");
                None
            }
            Err(_) => {
                warn!(subject, "narrative oracle timed out; using template");
                None
            }
        }
    }
}

struct DraftReport {
    items: Vec<SummaryItem>,
    text: String,
    source: NarrativeSource,
}

/// `[midnight, next midnight)` in UTC.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (from, from + chrono::Duration::days(1))
}

/// Per-app totals of intervals starting in `[from, to)`, longest first.
pub fn collect_items<'a>(
    entries: impl Iterator<Item = &'a TimeEntry>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<SummaryItem> {
    let mut by_app: HashMap<String, SummaryItem> = HashMap::new();
    for appointment in entries.flat_map(|e| e.appointments.iter()) {
        for interval in appointment.intervals_within(from, to) {
            let item = by_app.entry(appointment.app_name.clone()).or_insert_with(|| SummaryItem {
                app_name: appointment.app_name.clone(),
                total_seconds: 0.0,
                billable_seconds: 0.0,
                interval_count: 0,
            });
            item.total_seconds += interval.duration_seconds;
            item.interval_count += 1;
            if appointment.is_billable {
                item.billable_seconds += interval.duration_seconds;
            }
        }
    }
    sorted(by_app.into_values().collect())
}

fn merge_items<'a>(items: impl Iterator<Item = &'a SummaryItem>) -> Vec<SummaryItem> {
    let mut by_app: HashMap<String, SummaryItem> = HashMap::new();
    for item in items {
        by_app
            .entry(item.app_name.clone())
            .and_modify(|merged| {
                merged.total_seconds += item.total_seconds;
                merged.billable_seconds += item.billable_seconds;
                merged.interval_count += item.interval_count;
            })
            .or_insert_with(|| item.clone());
    }
    sorted(by_app.into_values().collect())
}

fn sorted(mut items: Vec<SummaryItem>) -> Vec<SummaryItem> {
    items.sort_by(|a, b| {
        b.total_seconds.total_cmp(&a.total_seconds).then_with(|| a.app_name.cmp(&b.app_name))
    });
    items
}
