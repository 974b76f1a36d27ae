//! SQLite-backed agent buffer for finalized intervals.

use std::sync::Arc;

use async_trait::async_trait;
use focusledger_core::LocalIntervalStore;
use focusledger_domain::{Result as DomainResult, TrackedInterval};
use rusqlite::{params, Connection};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use super::{decode_json, encode_json, map_join_error};
use crate::errors::map_sql;

/// Append-only store of intervals awaiting delivery, oldest first.
pub struct SqlIntervalStore {
    db: Arc<DbManager>,
}

impl SqlIntervalStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LocalIntervalStore for SqlIntervalStore {
    async fn append(&self, intervals: &[TrackedInterval]) -> DomainResult<()> {
        if intervals.is_empty() {
            return Ok(());
        }
        let db = Arc::clone(&self.db);
        let intervals = intervals.to_vec();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql)?;
            for interval in &intervals {
                insert_interval(&tx, interval)?;
            }
            tx.commit().map_err(map_sql)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn pending(&self) -> DomainResult<Vec<TrackedInterval>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<TrackedInterval>> {
            let conn = db.get_connection()?;
            query_pending(&conn)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn clear(&self, ids: &[Uuid]) -> DomainResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql)?;
            let mut removed = 0;
            for id in &ids {
                removed += tx
                    .execute("DELETE FROM pending_intervals WHERE id = ?1", params![id.to_string()])
                    .map_err(map_sql)?;
            }
            tx.commit().map_err(map_sql)?;
            Ok(removed)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

fn insert_interval(conn: &Connection, interval: &TrackedInterval) -> DomainResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO pending_intervals (id, session_id, interval_json, recorded_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            interval.id.to_string(),
            interval.session_id.to_string(),
            encode_json(interval)?,
            interval.recorded_at.timestamp_millis(),
        ],
    )
    .map_err(map_sql)?;
    Ok(())
}

fn query_pending(conn: &Connection) -> DomainResult<Vec<TrackedInterval>> {
    let mut stmt = conn
        .prepare("SELECT interval_json FROM pending_intervals ORDER BY seq")
        .map_err(map_sql)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(map_sql)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sql)?;

    rows.iter().map(|raw| decode_json("pending interval", raw)).collect()
}
