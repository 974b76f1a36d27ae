#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use focusledger_core::{
    AppointmentAggregator, ClassificationResolver, ClassifierOracle, EntryLocks, SummaryEngine,
};
use focusledger_domain::{Interval, Project};
use focusledger_infra::database::{
    DbManager, SqlIntervalStore, SqlProjectDirectory, SqlRuleStore, SqlSummaryRepository,
    SqlTimeEntryRepository,
};
use tempfile::TempDir;

/// Temporary migrated database that lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("ledger.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// The server-side pipeline wired over SQLite.
pub struct Pipeline {
    pub db: TestDatabase,
    pub rules: Arc<SqlRuleStore>,
    pub entries: Arc<SqlTimeEntryRepository>,
    pub projects: Arc<SqlProjectDirectory>,
    pub summaries: Arc<SqlSummaryRepository>,
    pub intervals: Arc<SqlIntervalStore>,
    pub resolver: Arc<ClassificationResolver>,
    pub aggregator: Arc<AppointmentAggregator>,
    pub engine: Arc<SummaryEngine>,
}

impl Pipeline {
    pub fn new(oracle: Option<Arc<dyn ClassifierOracle>>) -> Self {
        let db = TestDatabase::new();
        let rules = Arc::new(SqlRuleStore::new(db.manager.clone()));
        let entries = Arc::new(SqlTimeEntryRepository::new(db.manager.clone()));
        let projects = Arc::new(SqlProjectDirectory::new(db.manager.clone()));
        let summaries = Arc::new(SqlSummaryRepository::new(db.manager.clone()));
        let intervals = Arc::new(SqlIntervalStore::new(db.manager.clone()));
        let locks = Arc::new(EntryLocks::new());

        let mut resolver =
            ClassificationResolver::new(rules.clone(), entries.clone(), projects.clone(), locks.clone());
        if let Some(oracle) = oracle {
            resolver = resolver.with_oracle(oracle);
        }
        let resolver = Arc::new(resolver);
        let aggregator = Arc::new(AppointmentAggregator::new(
            entries.clone(),
            projects.clone(),
            resolver.clone(),
            locks,
        ));
        let engine = Arc::new(SummaryEngine::new(entries.clone(), projects.clone(), summaries.clone()));

        Self { db, rules, entries, projects, summaries, intervals, resolver, aggregator, engine }
    }

    pub async fn project(&self, id: &str, billable: bool, members: &[&str]) {
        let project = Project { id: id.into(), name: format!("Project {id}"), billable };
        self.projects.upsert_project(&project).await.expect("project upsert");
        for member in members {
            self.projects.add_member(id, member).await.expect("member added");
        }
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
}

pub fn interval(title: &str, app: &str, start: DateTime<Utc>, secs: i64) -> Interval {
    Interval::new(title, app, start, start + Duration::seconds(secs)).expect("valid interval")
}
