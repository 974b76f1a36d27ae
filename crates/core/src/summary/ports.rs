//! Port interfaces for summary persistence and narrative generation

use async_trait::async_trait;
use chrono::NaiveDate;
use focusledger_domain::{Result, Summary, SummaryItem, SummaryKind};

/// Summary storage with a uniqueness constraint on `(kind, subject_id, date)`.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    /// Insert, or replace the existing summary with the same key.
    async fn upsert_summary(&self, summary: &Summary) -> Result<()>;

    async fn find_summary(
        &self,
        kind: SummaryKind,
        subject_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Summary>>;

    async fn summaries_for_date(&self, kind: SummaryKind, date: NaiveDate) -> Result<Vec<Summary>>;
}

/// Free-text narrative generator. `Ok(None)` asks for the template fallback.
#[async_trait]
pub trait NarrativeOracle: Send + Sync {
    async fn summarize(
        &self,
        items: &[SummaryItem],
        subject_name: &str,
        date: NaiveDate,
    ) -> Result<Option<String>>;
}
