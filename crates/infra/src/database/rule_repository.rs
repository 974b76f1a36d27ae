//! SQLite-backed classification rule cache.
//!
//! The manual-beats-ai precedence is enforced inside the upsert statement so
//! that two concurrent writers can never let a learned rule replace an admin
//! override.

use std::sync::Arc;

use async_trait::async_trait;
use focusledger_core::RuleStore;
use focusledger_domain::{ClassificationRule, LedgerError, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;

use super::manager::DbManager;
use super::{from_millis, map_join_error, parse_label};
use crate::errors::map_sql;

/// SQLite-backed implementation of [`RuleStore`].
pub struct SqlRuleStore {
    db: Arc<DbManager>,
}

impl SqlRuleStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleStore for SqlRuleStore {
    async fn find(&self, app_name: &str) -> DomainResult<Option<ClassificationRule>> {
        let db = Arc::clone(&self.db);
        let app_name = app_name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<ClassificationRule>> {
            let conn = db.get_connection()?;
            query_rule(&conn, &app_name)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert(&self, rule: ClassificationRule) -> DomainResult<ClassificationRule> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<ClassificationRule> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql)?;
            upsert_rule(&tx, &rule)?;
            let stored = query_rule(&tx, &rule.app_name)?.ok_or_else(|| {
                LedgerError::Internal(format!("rule for {} vanished after upsert", rule.app_name))
            })?;
            tx.commit().map_err(map_sql)?;
            Ok(stored)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self) -> DomainResult<Vec<ClassificationRule>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ClassificationRule>> {
            let conn = db.get_connection()?;
            query_all_rules(&conn)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, app_name: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let app_name = app_name.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM classification_rules WHERE app_name = ?1", params![app_name])
                .map_err(map_sql)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

type RuleRow = (String, String, String, Option<String>, i64);

const SELECT_RULE: &str =
    "SELECT app_name, classification, source, notes, updated_at FROM classification_rules";

fn upsert_rule(conn: &Connection, rule: &ClassificationRule) -> DomainResult<()> {
    conn.execute(
        "INSERT INTO classification_rules (app_name, classification, source, notes, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(app_name) DO UPDATE SET
            classification = excluded.classification,
            source = excluded.source,
            notes = excluded.notes,
            updated_at = excluded.updated_at
         WHERE classification_rules.source <> 'manual' OR excluded.source = 'manual'",
        params![
            rule.app_name,
            rule.classification.as_str(),
            rule.source.as_str(),
            rule.notes,
            rule.updated_at.timestamp_millis(),
        ],
    )
    .map_err(map_sql)?;
    Ok(())
}

fn query_rule(conn: &Connection, app_name: &str) -> DomainResult<Option<ClassificationRule>> {
    let row: Option<RuleRow> = conn
        .query_row(&format!("{SELECT_RULE} WHERE app_name = ?1"), params![app_name], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .optional()
        .map_err(map_sql)?;

    row.map(rule_from_row).transpose()
}

fn query_all_rules(conn: &Connection) -> DomainResult<Vec<ClassificationRule>> {
    let mut stmt = conn.prepare(&format!("{SELECT_RULE} ORDER BY app_name")).map_err(map_sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)))
        .map_err(map_sql)?
        .collect::<Result<Vec<RuleRow>, _>>()
        .map_err(map_sql)?;

    rows.into_iter().map(rule_from_row).collect()
}

fn rule_from_row(row: RuleRow) -> DomainResult<ClassificationRule> {
    let (app_name, classification, source, notes, updated_at) = row;
    Ok(ClassificationRule {
        app_name,
        classification: parse_label("classification", &classification)?,
        source: parse_label("source", &source)?,
        notes,
        updated_at: from_millis("updated_at", updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use focusledger_domain::{Classification, RuleSource};
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, SqlRuleStore) {
        let dir = TempDir::new().expect("temp dir created");
        let db = DbManager::new(dir.path().join("rules.db"), 2).expect("manager created");
        db.run_migrations().expect("migrations run");
        (dir, SqlRuleStore::new(Arc::new(db)))
    }

    #[tokio::test]
    async fn learned_rule_round_trips() {
        let (_dir, store) = store();
        store
            .upsert(ClassificationRule::learned("code", Classification::Billable))
            .await
            .expect("upsert");

        let found = store.find("code").await.expect("find").expect("rule present");
        assert_eq!(found.classification, Classification::Billable);
        assert_eq!(found.source, RuleSource::Ai);
        assert!(store.find("slack").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn ai_write_never_replaces_manual_rule() {
        let (_dir, store) = store();
        store
            .upsert(ClassificationRule::manual("code", Classification::NonBillable, None))
            .await
            .expect("manual upsert");

        let stored = store
            .upsert(ClassificationRule::learned("code", Classification::Billable))
            .await
            .expect("ai upsert");

        assert_eq!(stored.source, RuleSource::Manual);
        assert_eq!(stored.classification, Classification::NonBillable);
    }

    #[tokio::test]
    async fn manual_write_replaces_learned_rule() {
        let (_dir, store) = store();
        store
            .upsert(ClassificationRule::learned("excel", Classification::Ambiguous))
            .await
            .expect("ai upsert");

        let stored = store
            .upsert(ClassificationRule::manual(
                "excel",
                Classification::Billable,
                Some("client spreadsheets".into()),
            ))
            .await
            .expect("manual upsert");

        assert_eq!(stored.source, RuleSource::Manual);
        assert_eq!(stored.notes.as_deref(), Some("client spreadsheets"));
    }

    #[tokio::test]
    async fn list_and_delete() {
        let (_dir, store) = store();
        for name in ["zoom", "code", "slack"] {
            store
                .upsert(ClassificationRule::learned(name, Classification::Ambiguous))
                .await
                .expect("upsert");
        }

        let names: Vec<String> =
            store.list().await.expect("list").into_iter().map(|r| r.app_name).collect();
        assert_eq!(names, vec!["code", "slack", "zoom"]);

        assert!(store.delete("slack").await.expect("delete"));
        assert!(!store.delete("slack").await.expect("second delete"));
        assert_eq!(store.list().await.expect("list").len(), 2);
    }
}
