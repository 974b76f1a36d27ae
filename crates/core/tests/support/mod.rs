//! Shared test helpers for `focusledger-core` integration tests.
//!
//! Counting oracle doubles plus a fully wired in-memory pipeline so the
//! scenario tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod oracles;

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use focusledger_core::memory::{
    InMemoryIntervalStore, InMemoryProjectDirectory, InMemoryRuleStore,
    InMemorySummaryRepository, InMemoryTimeEntryRepository,
};
use focusledger_core::{
    AppointmentAggregator, ClassificationResolver, ClassifierOracle, CoalescerConfig, EntryLocks,
    NarrativeOracle, SessionRegistry, SummaryEngine,
};
use focusledger_domain::Interval;

/// Every in-memory store plus the services built on them.
pub struct Pipeline {
    pub rules: Arc<InMemoryRuleStore>,
    pub entries: Arc<InMemoryTimeEntryRepository>,
    pub projects: Arc<InMemoryProjectDirectory>,
    pub summaries: Arc<InMemorySummaryRepository>,
    pub local: Arc<InMemoryIntervalStore>,
    pub resolver: Arc<ClassificationResolver>,
    pub aggregator: Arc<AppointmentAggregator>,
    pub engine: Arc<SummaryEngine>,
    pub registry: Arc<SessionRegistry>,
}

pub struct PipelineBuilder {
    oracle: Option<Arc<dyn ClassifierOracle>>,
    narrator: Option<Arc<dyn NarrativeOracle>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self { oracle: None, narrator: None }
    }

    pub fn oracle(mut self, oracle: Arc<dyn ClassifierOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn narrator(mut self, narrator: Arc<dyn NarrativeOracle>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn build(self) -> Pipeline {
        let rules = Arc::new(InMemoryRuleStore::default());
        let entries = Arc::new(InMemoryTimeEntryRepository::default());
        let projects = Arc::new(InMemoryProjectDirectory::default());
        let summaries = Arc::new(InMemorySummaryRepository::default());
        let local = Arc::new(InMemoryIntervalStore::default());
        let locks = Arc::new(EntryLocks::new());

        let mut resolver = ClassificationResolver::new(
            rules.clone(),
            entries.clone(),
            projects.clone(),
            locks.clone(),
        );
        if let Some(oracle) = self.oracle {
            resolver = resolver.with_oracle(oracle);
        }
        let resolver = Arc::new(resolver);

        let aggregator = Arc::new(AppointmentAggregator::new(
            entries.clone(),
            projects.clone(),
            resolver.clone(),
            locks,
        ));

        let mut engine = SummaryEngine::new(entries.clone(), projects.clone(), summaries.clone());
        if let Some(narrator) = self.narrator {
            engine = engine.with_narrator(narrator);
        }

        let registry = Arc::new(SessionRegistry::new(local.clone(), CoalescerConfig::default()));

        Pipeline {
            rules,
            entries,
            projects,
            summaries,
            local,
            resolver,
            aggregator,
            engine: Arc::new(engine),
            registry,
        }
    }
}

/// 2026-03-02 00:00:00 UTC.
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
}

/// `day()` at 09:00 UTC plus `secs`.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid timestamp")
        + Duration::seconds(secs)
}

pub fn interval(app: &str, start_secs: i64, len_secs: i64) -> Interval {
    Interval::new(app, app, at(start_secs), at(start_secs + len_secs)).expect("valid interval")
}
