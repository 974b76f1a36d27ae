//! SQLite-backed time entry documents.
//!
//! Each `(user_id, project_id)` row stores its appointments as one JSON
//! document. The `app_keys` column (`|code|slack|`) lets classification
//! overrides find affected entries without decoding every row.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use focusledger_core::TimeEntryRepository;
use focusledger_domain::{Appointment, Result as DomainResult, TimeEntry};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tokio::task;

use super::manager::DbManager;
use super::{decode_json, encode_json, from_millis, map_join_error};
use crate::errors::map_sql;

/// SQLite-backed implementation of [`TimeEntryRepository`].
pub struct SqlTimeEntryRepository {
    db: Arc<DbManager>,
}

impl SqlTimeEntryRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn query(&self, filter: &'static str, arg: String) -> DomainResult<Vec<TimeEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<TimeEntry>> {
            let conn = db.get_connection()?;
            query_entries(&conn, filter, &arg)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl TimeEntryRepository for SqlTimeEntryRepository {
    async fn find_entry(&self, user_id: &str, project_id: &str) -> DomainResult<Option<TimeEntry>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let project_id = project_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<TimeEntry>> {
            let conn = db.get_connection()?;
            query_entry(&conn, &user_id, &project_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert_entry(&self, entry: &TimeEntry) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let entry = entry.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_entry(&conn, &entry)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn entries_with_app(&self, app_key: &str) -> DomainResult<Vec<TimeEntry>> {
        let pattern = format!("%|{}|%", escape_like(app_key));
        let entries = self.query("app_keys LIKE ?1 ESCAPE '\\'", pattern).await?;
        Ok(entries.into_iter().filter(|entry| entry.has_app(app_key)).collect())
    }

    async fn entries_for_user(&self, user_id: &str) -> DomainResult<Vec<TimeEntry>> {
        self.query("user_id = ?1", user_id.to_string()).await
    }

    async fn entries_for_project(&self, project_id: &str) -> DomainResult<Vec<TimeEntry>> {
        self.query("project_id = ?1", project_id.to_string()).await
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn app_keys_column(entry: &TimeEntry) -> String {
    let keys = entry.app_keys();
    if keys.is_empty() {
        "|".to_string()
    } else {
        format!("|{}|", keys.join("|"))
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

type EntryRow = (String, String, String, i64);

const SELECT_ENTRY: &str =
    "SELECT user_id, project_id, appointments_json, updated_at FROM time_entries";

fn upsert_entry(conn: &Connection, entry: &TimeEntry) -> DomainResult<()> {
    let appointments = encode_json(&entry.appointments)?;
    let updated_at = Utc::now().timestamp_millis();

    conn.execute(
        "INSERT INTO time_entries (user_id, project_id, appointments_json, app_keys, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, project_id) DO UPDATE SET
            appointments_json = excluded.appointments_json,
            app_keys = excluded.app_keys,
            updated_at = excluded.updated_at",
        params![entry.user_id, entry.project_id, appointments, app_keys_column(entry), updated_at],
    )
    .map_err(map_sql)?;
    Ok(())
}

fn query_entry(
    conn: &Connection,
    user_id: &str,
    project_id: &str,
) -> DomainResult<Option<TimeEntry>> {
    let row: Option<EntryRow> = conn
        .query_row(
            &format!("{SELECT_ENTRY} WHERE user_id = ?1 AND project_id = ?2"),
            params![user_id, project_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(map_sql)?;

    row.map(entry_from_row).transpose()
}

fn query_entries(conn: &Connection, filter: &str, arg: &dyn ToSql) -> DomainResult<Vec<TimeEntry>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_ENTRY} WHERE {filter} ORDER BY user_id, project_id"))
        .map_err(map_sql)?;
    let rows = stmt
        .query_map(&[arg][..], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .map_err(map_sql)?
        .collect::<Result<Vec<EntryRow>, _>>()
        .map_err(map_sql)?;

    rows.into_iter().map(entry_from_row).collect()
}

fn entry_from_row(row: EntryRow) -> DomainResult<TimeEntry> {
    let (user_id, project_id, appointments, updated_at) = row;
    let appointments: Vec<Appointment> = decode_json("appointments", &appointments)?;
    Ok(TimeEntry {
        user_id,
        project_id,
        appointments,
        updated_at: from_millis("updated_at", updated_at)?,
    })
}
