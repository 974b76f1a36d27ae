//! In-memory adapters for every persistence port
//!
//! Used by tests and by embedders that do not need durability. Each store
//! can be switched into a failing mode to exercise degraded paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use focusledger_domain::{
    ClassificationRule, LedgerError, Project, Result, Summary, SummaryKind, TimeEntry,
    TrackedInterval,
};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::aggregation::ports::{ProjectDirectory, TimeEntryRepository};
use crate::classification::ports::RuleStore;
use crate::summary::ports::SummaryRepository;
use crate::tracking::ports::LocalIntervalStore;

#[derive(Debug, Default)]
struct FailSwitch(AtomicBool);

impl FailSwitch {
    fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.0.load(Ordering::SeqCst) {
            Err(LedgerError::Database(format!("{what} unavailable")))
        } else {
            Ok(())
        }
    }
}

/// Rule cache over a map; manual rules win over `ai` writes.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<HashMap<String, ClassificationRule>>,
    fail: FailSwitch,
}

impl InMemoryRuleStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail.set(failing);
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find(&self, app_name: &str) -> Result<Option<ClassificationRule>> {
        self.fail.check("rule store")?;
        Ok(self.rules.read().get(app_name).cloned())
    }

    async fn upsert(&self, rule: ClassificationRule) -> Result<ClassificationRule> {
        self.fail.check("rule store")?;
        let mut rules = self.rules.write();
        match rules.get(&rule.app_name) {
            Some(existing) if !existing.accepts_overwrite_from(&rule) => Ok(existing.clone()),
            _ => {
                rules.insert(rule.app_name.clone(), rule.clone());
                Ok(rule)
            }
        }
    }

    async fn list(&self) -> Result<Vec<ClassificationRule>> {
        self.fail.check("rule store")?;
        let mut rules: Vec<_> = self.rules.read().values().cloned().collect();
        rules.sort_by(|a, b| a.app_name.cmp(&b.app_name));
        Ok(rules)
    }

    async fn delete(&self, app_name: &str) -> Result<bool> {
        self.fail.check("rule store")?;
        Ok(self.rules.write().remove(app_name).is_some())
    }
}

/// Time entries keyed by `(user_id, project_id)`.
#[derive(Debug, Default)]
pub struct InMemoryTimeEntryRepository {
    entries: RwLock<BTreeMap<(String, String), TimeEntry>>,
    fail: FailSwitch,
    fail_writes: FailSwitch,
}

impl InMemoryTimeEntryRepository {
    pub fn set_failing(&self, failing: bool) {
        self.fail.set(failing);
    }

    /// Reads keep working; only upserts fail.
    pub fn set_failing_writes(&self, failing: bool) {
        self.fail_writes.set(failing);
    }

    pub fn all(&self) -> Vec<TimeEntry> {
        self.entries.read().values().cloned().collect()
    }

    fn matching(&self, keep: impl Fn(&TimeEntry) -> bool) -> Result<Vec<TimeEntry>> {
        self.fail.check("time entry store")?;
        Ok(self.entries.read().values().filter(|e| keep(e)).cloned().collect())
    }
}

#[async_trait]
impl TimeEntryRepository for InMemoryTimeEntryRepository {
    async fn find_entry(&self, user_id: &str, project_id: &str) -> Result<Option<TimeEntry>> {
        self.fail.check("time entry store")?;
        Ok(self.entries.read().get(&(user_id.to_string(), project_id.to_string())).cloned())
    }

    async fn upsert_entry(&self, entry: &TimeEntry) -> Result<()> {
        self.fail.check("time entry store")?;
        self.fail_writes.check("time entry store")?;
        self.entries
            .write()
            .insert((entry.user_id.clone(), entry.project_id.clone()), entry.clone());
        Ok(())
    }

    async fn entries_with_app(&self, app_key: &str) -> Result<Vec<TimeEntry>> {
        self.matching(|e| e.has_app(app_key))
    }

    async fn entries_for_user(&self, user_id: &str) -> Result<Vec<TimeEntry>> {
        self.matching(|e| e.user_id == user_id)
    }

    async fn entries_for_project(&self, project_id: &str) -> Result<Vec<TimeEntry>> {
        self.matching(|e| e.project_id == project_id)
    }
}

/// Projects and memberships held in memory.
#[derive(Debug, Default)]
pub struct InMemoryProjectDirectory {
    projects: RwLock<BTreeMap<String, Project>>,
    members: RwLock<BTreeMap<String, Vec<String>>>,
}

impl InMemoryProjectDirectory {
    pub fn upsert_project(&self, id: &str, name: &str, billable: bool) {
        self.projects.write().insert(
            id.to_string(),
            Project { id: id.to_string(), name: name.to_string(), billable },
        );
    }

    pub fn set_billable(&self, id: &str, billable: bool) {
        if let Some(project) = self.projects.write().get_mut(id) {
            project.billable = billable;
        }
    }

    pub fn add_member(&self, project_id: &str, user_id: &str) {
        let mut members = self.members.write();
        let list = members.entry(project_id.to_string()).or_default();
        if !list.iter().any(|m| m == user_id) {
            list.push(user_id.to_string());
        }
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryProjectDirectory {
    async fn is_project_billable(&self, project_id: &str) -> Result<bool> {
        Ok(self.projects.read().get(project_id).is_some_and(|p| p.billable))
    }

    async fn project_name(&self, project_id: &str) -> Result<Option<String>> {
        Ok(self.projects.read().get(project_id).map(|p| p.name.clone()))
    }

    async fn project_members(&self, project_id: &str) -> Result<Vec<String>> {
        Ok(self.members.read().get(project_id).cloned().unwrap_or_default())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.read().values().cloned().collect())
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        let mut users: Vec<String> = self.members.read().values().flatten().cloned().collect();
        users.sort();
        users.dedup();
        Ok(users)
    }
}

/// Summaries keyed by `(kind, subject_id, date)`.
#[derive(Debug, Default)]
pub struct InMemorySummaryRepository {
    summaries: RwLock<HashMap<(SummaryKind, String, NaiveDate), Summary>>,
    fail: FailSwitch,
}

impl InMemorySummaryRepository {
    pub fn set_failing(&self, failing: bool) {
        self.fail.set(failing);
    }

    pub fn len(&self) -> usize {
        self.summaries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.read().is_empty()
    }
}

#[async_trait]
impl SummaryRepository for InMemorySummaryRepository {
    async fn upsert_summary(&self, summary: &Summary) -> Result<()> {
        self.fail.check("summary store")?;
        self.summaries
            .write()
            .insert((summary.kind, summary.subject_id.clone(), summary.date), summary.clone());
        Ok(())
    }

    async fn find_summary(
        &self,
        kind: SummaryKind,
        subject_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Summary>> {
        self.fail.check("summary store")?;
        Ok(self.summaries.read().get(&(kind, subject_id.to_string(), date)).cloned())
    }

    async fn summaries_for_date(&self, kind: SummaryKind, date: NaiveDate) -> Result<Vec<Summary>> {
        self.fail.check("summary store")?;
        let mut found: Vec<Summary> = self
            .summaries
            .read()
            .values()
            .filter(|s| s.kind == kind && s.date == date)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        Ok(found)
    }
}

/// Agent-side interval buffer in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryIntervalStore {
    intervals: RwLock<Vec<TrackedInterval>>,
    fail: FailSwitch,
}

impl InMemoryIntervalStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail.set(failing);
    }
}

#[async_trait]
impl LocalIntervalStore for InMemoryIntervalStore {
    async fn append(&self, intervals: &[TrackedInterval]) -> Result<()> {
        self.fail.check("local interval store")?;
        let mut stored = self.intervals.write();
        for interval in intervals {
            if !stored.iter().any(|existing| existing.id == interval.id) {
                stored.push(interval.clone());
            }
        }
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<TrackedInterval>> {
        self.fail.check("local interval store")?;
        Ok(self.intervals.read().clone())
    }

    async fn clear(&self, ids: &[Uuid]) -> Result<usize> {
        self.fail.check("local interval store")?;
        let mut stored = self.intervals.write();
        let before = stored.len();
        stored.retain(|interval| !ids.contains(&interval.id));
        Ok(before - stored.len())
    }
}

#[cfg(test)]
mod tests {
    use focusledger_domain::{Classification, RuleSource};

    use super::*;

    #[tokio::test]
    async fn ai_upsert_does_not_replace_manual_rule() {
        let store = InMemoryRuleStore::default();
        store
            .upsert(ClassificationRule::manual("slack", Classification::NonBillable, None))
            .await
            .unwrap();
        let stored = store
            .upsert(ClassificationRule::learned("slack", Classification::Billable))
            .await
            .unwrap();

        assert_eq!(stored.source, RuleSource::Manual);
        assert_eq!(
            store.find("slack").await.unwrap().unwrap().classification,
            Classification::NonBillable
        );
    }

    #[tokio::test]
    async fn unknown_project_is_not_billable() {
        let dir = InMemoryProjectDirectory::default();
        dir.upsert_project("p1", "Apollo", true);
        assert!(dir.is_project_billable("p1").await.unwrap());
        assert!(!dir.is_project_billable("p2").await.unwrap());
    }
}
