//! Classification resolver
//!
//! Rule cache first, oracle on a miss or an `ambiguous` rule, deterministic
//! fallback when no oracle is usable. `resolve` never fails: every error
//! path degrades to a safe classification.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use focusledger_domain::{
    normalize_app_name, Actor, AppActivity, Classification, ClassificationRule, LedgerError,
    OracleVerdict, OverrideReport, Result,
};
use tracing::{debug, error, info, warn};

use super::fallback::KeywordClassifier;
use super::ports::{ClassifierOracle, RuleStore};
use crate::aggregation::locks::EntryLocks;
use crate::aggregation::ports::{ProjectDirectory, TimeEntryRepository};

const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a resolution came from, for callers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    EmptyActivity,
    Cache,
    Oracle,
    Fallback,
    /// The oracle failed; the safe default was used.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub classification: Classification,
    pub source: ResolutionSource,
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: u64,
    pub oracle_calls: u64,
    pub rules_learned: u64,
}

pub struct ClassificationResolver {
    rules: Arc<dyn RuleStore>,
    entries: Arc<dyn TimeEntryRepository>,
    projects: Arc<dyn ProjectDirectory>,
    locks: Arc<EntryLocks>,
    oracle: Option<Arc<dyn ClassifierOracle>>,
    fallback: KeywordClassifier,
    oracle_timeout: Duration,
    oracle_disabled: AtomicBool,
    cache_hits: AtomicU64,
    oracle_calls: AtomicU64,
    rules_learned: AtomicU64,
}

impl ClassificationResolver {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        entries: Arc<dyn TimeEntryRepository>,
        projects: Arc<dyn ProjectDirectory>,
        locks: Arc<EntryLocks>,
    ) -> Self {
        Self {
            rules,
            entries,
            projects,
            locks,
            oracle: None,
            fallback: KeywordClassifier::new(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            oracle_disabled: AtomicBool::new(false),
            cache_hits: AtomicU64::new(0),
            oracle_calls: AtomicU64::new(0),
            rules_learned: AtomicU64::new(0),
        }
    }

    /// Use an external oracle; without one the keyword fallback answers.
    pub fn with_oracle(mut self, oracle: Arc<dyn ClassifierOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn oracle_enabled(&self) -> bool {
        self.oracle.is_some() && !self.oracle_disabled.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            oracle_calls: self.oracle_calls.load(Ordering::Relaxed),
            rules_learned: self.rules_learned.load(Ordering::Relaxed),
        }
    }

    pub async fn resolve(&self, activity: &AppActivity) -> Classification {
        self.resolve_detailed(activity, None).await.classification
    }

    /// Resolves with optional free-text context forwarded to the oracle.
    pub async fn resolve_detailed(
        &self,
        activity: &AppActivity,
        context: Option<&str>,
    ) -> Resolution {
        if activity.is_empty() {
            return Resolution {
                classification: Classification::Ambiguous,
                source: ResolutionSource::EmptyActivity,
            };
        }

        let key = normalize_app_name(activity.identifier());
        // A failed lookup still gets an answer, but never writes a rule: the
        // key may hold an ambiguous rule that must not be replaced.
        let (cached, lookup_failed) = match self.rules.find(&key).await {
            Ok(rule) => (rule, false),
            Err(err) => {
                warn!(app = %key, error = %err, "rule lookup failed; answering without caching");
                (None, true)
            }
        };

        if let Some(rule) = &cached {
            if rule.classification != Classification::Ambiguous {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(app = %key, classification = %rule.classification, "rule cache hit");
                return Resolution {
                    classification: rule.classification,
                    source: ResolutionSource::Cache,
                };
            }
        }

        let Some(oracle) = self.usable_oracle() else {
            return self.fallback_resolution(activity);
        };

        match self.ask_oracle(oracle.as_ref(), activity, context).await {
            Ok(verdict) => {
                if cached.is_none() && !lookup_failed {
                    self.learn(&key, &verdict).await;
                }
                Resolution { classification: verdict.classification, source: ResolutionSource::Oracle }
            }
            Err(LedgerError::Config(reason)) => {
                if !self.oracle_disabled.swap(true, Ordering::Relaxed) {
                    error!(reason = %reason, "classification oracle misconfigured; using keyword fallback for this run");
                }
                self.fallback_resolution(activity)
            }
            Err(err) => {
                warn!(app = %key, error = %err, "classification oracle failed; defaulting to non-billable");
                Resolution {
                    classification: Classification::NonBillable,
                    source: ResolutionSource::Default,
                }
            }
        }
    }

    /// Admin-only manual override. The rule is written first; historical
    /// appointments are then re-stamped one time entry at a time, and
    /// failures there are counted rather than fatal.
    pub async fn override_classification(
        &self,
        actor: &Actor,
        app_name: &str,
        classification: Classification,
        notes: Option<String>,
    ) -> Result<OverrideReport> {
        ensure_admin(actor, "override classifications")?;
        if app_name.trim().is_empty() {
            return Err(LedgerError::InvalidInput("app name is required".to_string()));
        }

        let key = normalize_app_name(app_name);
        let rule = self
            .rules
            .upsert(ClassificationRule::manual(key.clone(), classification, notes))
            .await?;
        info!(actor = %actor.id, app = %key, classification = %classification, "manual classification override");

        let (entries_updated, entries_failed) = self.restamp_history(&key, classification).await;
        Ok(OverrideReport { rule, entries_updated, entries_failed })
    }

    pub async fn list_rules(&self) -> Result<Vec<ClassificationRule>> {
        self.rules.list().await
    }

    pub async fn delete_rule(&self, actor: &Actor, app_name: &str) -> Result<()> {
        ensure_admin(actor, "delete classification rules")?;
        let key = normalize_app_name(app_name);
        if self.rules.delete(&key).await? {
            info!(actor = %actor.id, app = %key, "classification rule deleted");
            Ok(())
        } else {
            Err(LedgerError::NotFound(format!("classification rule for '{key}'")))
        }
    }

    fn usable_oracle(&self) -> Option<&Arc<dyn ClassifierOracle>> {
        if self.oracle_disabled.load(Ordering::Relaxed) {
            return None;
        }
        self.oracle.as_ref()
    }

    async fn ask_oracle(
        &self,
        oracle: &dyn ClassifierOracle,
        activity: &AppActivity,
        context: Option<&str>,
    ) -> Result<OracleVerdict> {
        self.oracle_calls.fetch_add(1, Ordering::Relaxed);
        let call = oracle.classify(&activity.app_name, &activity.app_title, context);
        match tokio::time::timeout(self.oracle_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Network(format!(
                "classification oracle timed out after {:?}",
                self.oracle_timeout
            ))),
        }
    }

    fn fallback_resolution(&self, activity: &AppActivity) -> Resolution {
        let verdict = self.fallback.verdict(&activity.app_name, &activity.app_title);
        Resolution { classification: verdict.classification, source: ResolutionSource::Fallback }
    }

    async fn learn(&self, key: &str, verdict: &OracleVerdict) {
        let rule = ClassificationRule::learned(key, verdict.classification);
        match self.rules.upsert(rule).await {
            Ok(stored) => {
                self.rules_learned.fetch_add(1, Ordering::Relaxed);
                debug!(app = %key, classification = %stored.classification, source = %stored.source, "rule learned");
            }
            Err(err) => warn!(app = %key, error = %err, "failed to persist learned rule"),
        }
    }

    async fn restamp_history(&self, key: &str, classification: Classification) -> (usize, usize) {
        let entries = match self.entries.entries_with_app(key).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(app = %key, error = %err, "could not list historical entries for re-stamp");
                return (0, 0);
            }
        };

        let mut updated = 0;
        let mut failed = 0;
        for stale in entries {
            match self.restamp_entry(&stale.user_id, &stale.project_id, key, classification).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(err) => {
                    failed += 1;
                    warn!(
                        user_id = %stale.user_id,
                        project_id = %stale.project_id,
                        app = %key,
                        error = %err,
                        "re-stamp failed; entry left unreclassified"
                    );
                }
            }
        }
        info!(app = %key, updated, failed, "historical appointments re-stamped");
        (updated, failed)
    }

    async fn restamp_entry(
        &self,
        user_id: &str,
        project_id: &str,
        key: &str,
        classification: Classification,
    ) -> Result<bool> {
        let _guard = self.locks.lock(user_id, project_id).await;
        let Some(mut entry) = self.entries.find_entry(user_id, project_id).await? else {
            return Ok(false);
        };
        let project_billable = self.projects.is_project_billable(project_id).await?;
        if !entry.restamp_app(key, classification, project_billable) {
            return Ok(false);
        }
        self.entries.upsert_entry(&entry).await?;
        Ok(true)
    }
}

fn ensure_admin(actor: &Actor, action: &str) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        warn!(actor = %actor.id, role = %actor.role, action, "rejected non-admin request");
        Err(LedgerError::Forbidden(format!("only admins may {action}")))
    }
}
