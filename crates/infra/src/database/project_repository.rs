//! SQLite-backed project directory: projects, billable flags and members.

use std::sync::Arc;

use async_trait::async_trait;
use focusledger_core::ProjectDirectory;
use focusledger_domain::{LedgerError, Project, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;

use super::manager::DbManager;
use super::map_join_error;
use crate::errors::map_sql;

/// SQLite-backed implementation of [`ProjectDirectory`] plus the admin
/// helpers used to populate it.
pub struct SqlProjectDirectory {
    db: Arc<DbManager>,
}

impl SqlProjectDirectory {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert a project or update its name and billable flag.
    pub async fn upsert_project(&self, project: &Project) -> DomainResult<()> {
        if project.id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("project id must not be empty".into()));
        }
        let db = Arc::clone(&self.db);
        let project = project.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO projects (id, name, billable) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, billable = excluded.billable",
                params![project.id, project.name, project.billable],
            )
            .map_err(map_sql)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Add a member to an existing project. Adding twice is a no-op.
    pub async fn add_member(&self, project_id: &str, user_id: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let project_id = project_id.to_string();
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_member(&conn, &project_id, &user_id)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Returns whether the membership existed.
    pub async fn remove_member(&self, project_id: &str, user_id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let project_id = project_id.to_string();
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute(
                    "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
                    params![project_id, user_id],
                )
                .map_err(map_sql)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn strings(&self, sql: &'static str, arg: Option<String>) -> DomainResult<Vec<String>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<String>> {
            let conn = db.get_connection()?;
            query_strings(&conn, sql, arg.as_deref())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl ProjectDirectory for SqlProjectDirectory {
    async fn is_project_billable(&self, project_id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let project_id = project_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let flag: Option<bool> = conn
                .query_row(
                    "SELECT billable FROM projects WHERE id = ?1",
                    params![project_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_sql)?;
            Ok(flag.unwrap_or(false))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn project_name(&self, project_id: &str) -> DomainResult<Option<String>> {
        let mut names = self
            .strings("SELECT name FROM projects WHERE id = ?1", Some(project_id.to_string()))
            .await?;
        Ok(names.pop())
    }

    async fn project_members(&self, project_id: &str) -> DomainResult<Vec<String>> {
        self.strings(
            "SELECT user_id FROM project_members WHERE project_id = ?1 ORDER BY user_id",
            Some(project_id.to_string()),
        )
        .await
    }

    async fn list_projects(&self) -> DomainResult<Vec<Project>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Project>> {
            let conn = db.get_connection()?;
            query_projects(&conn)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_users(&self) -> DomainResult<Vec<String>> {
        self.strings("SELECT DISTINCT user_id FROM project_members ORDER BY user_id", None).await
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

fn insert_member(conn: &Connection, project_id: &str, user_id: &str) -> DomainResult<()> {
    let known: bool = conn
        .query_row("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)", params![project_id], |row| {
            row.get(0)
        })
        .map_err(map_sql)?;
    if !known {
        return Err(LedgerError::NotFound(format!("project {project_id}")));
    }

    conn.execute(
        "INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?1, ?2)",
        params![project_id, user_id],
    )
    .map_err(map_sql)?;
    Ok(())
}

fn query_strings(conn: &Connection, sql: &str, arg: Option<&str>) -> DomainResult<Vec<String>> {
    let mut stmt = conn.prepare(sql).map_err(map_sql)?;
    let rows = match arg {
        Some(arg) => stmt.query_map(params![arg], first_column),
        None => stmt.query_map([], first_column),
    }
    .map_err(map_sql)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(map_sql)
}

fn first_column(row: &Row<'_>) -> rusqlite::Result<String> {
    row.get(0)
}

fn query_projects(conn: &Connection) -> DomainResult<Vec<Project>> {
    let mut stmt =
        conn.prepare("SELECT id, name, billable FROM projects ORDER BY id").map_err(map_sql)?;
    let rows = stmt
        .query_map([], |row| Ok(Project { id: row.get(0)?, name: row.get(1)?, billable: row.get(2)? }))
        .map_err(map_sql)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(map_sql)
}
