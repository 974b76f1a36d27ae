//! SQLite-backed summary storage keyed by `(kind, subject_id, date)`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use focusledger_core::SummaryRepository;
use focusledger_domain::{Result as DomainResult, Summary, SummaryKind};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;

use super::manager::DbManager;
use super::{decode_json, encode_json, map_join_error};
use crate::errors::map_sql;

/// SQLite-backed implementation of [`SummaryRepository`].
pub struct SqlSummaryRepository {
    db: Arc<DbManager>,
}

impl SqlSummaryRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SummaryRepository for SqlSummaryRepository {
    async fn upsert_summary(&self, summary: &Summary) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let summary = summary.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_summary(&conn, &summary)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_summary(
        &self,
        kind: SummaryKind,
        subject_id: &str,
        date: NaiveDate,
    ) -> DomainResult<Option<Summary>> {
        let db = Arc::clone(&self.db);
        let subject_id = subject_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Summary>> {
            let conn = db.get_connection()?;
            query_summary(&conn, kind, &subject_id, date)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn summaries_for_date(
        &self,
        kind: SummaryKind,
        date: NaiveDate,
    ) -> DomainResult<Vec<Summary>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Summary>> {
            let conn = db.get_connection()?;
            query_summaries_for_date(&conn, kind, date)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn upsert_summary(conn: &Connection, summary: &Summary) -> DomainResult<()> {
    let document = encode_json(summary)?;

    conn.execute(
        "INSERT INTO summaries (kind, subject_id, date, summary_json, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(kind, subject_id, date) DO UPDATE SET
            summary_json = excluded.summary_json,
            generated_at = excluded.generated_at",
        params![
            summary.kind.as_str(),
            summary.subject_id,
            date_key(summary.date),
            document,
            summary.generated_at.timestamp_millis(),
        ],
    )
    .map_err(map_sql)?;
    Ok(())
}

fn query_summary(
    conn: &Connection,
    kind: SummaryKind,
    subject_id: &str,
    date: NaiveDate,
) -> DomainResult<Option<Summary>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT summary_json FROM summaries WHERE kind = ?1 AND subject_id = ?2 AND date = ?3",
            params![kind.as_str(), subject_id, date_key(date)],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sql)?;

    raw.map(|raw| decode_json("summary", &raw)).transpose()
}

fn query_summaries_for_date(
    conn: &Connection,
    kind: SummaryKind,
    date: NaiveDate,
) -> DomainResult<Vec<Summary>> {
    let mut stmt = conn
        .prepare(
            "SELECT summary_json FROM summaries
             WHERE kind = ?1 AND date = ?2
             ORDER BY subject_id",
        )
        .map_err(map_sql)?;
    let rows = stmt
        .query_map(params![kind.as_str(), date_key(date)], |row| row.get::<_, String>(0))
        .map_err(map_sql)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sql)?;

    rows.iter().map(|raw| decode_json("summary", raw)).collect()
}
