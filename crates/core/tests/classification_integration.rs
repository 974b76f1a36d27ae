//! Classification resolver behaviour against the in-memory stores.

mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use focusledger_core::memory::{
    InMemoryProjectDirectory, InMemoryRuleStore, InMemoryTimeEntryRepository,
};
use focusledger_core::{ClassificationResolver, EntryLocks, ResolutionSource, RuleStore};
use focusledger_domain::{
    Actor, AppActivity, Classification, ClassificationRule, LedgerError, Result, Role, RuleSource,
};
use support::oracles::CountingOracle;
use support::{interval, PipelineBuilder};

fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

#[tokio::test]
async fn unknown_app_learns_rule_from_oracle() {
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.9));
    let p = PipelineBuilder::new().oracle(oracle.clone()).build();

    let resolved = p.resolver.resolve(&AppActivity::new("C:\\Tools\\Figma.exe", "Board")).await;

    assert_eq!(resolved, Classification::Billable);
    let rule = p.rules.find("figma").await.unwrap().expect("rule persisted");
    assert_eq!(rule.classification, Classification::Billable);
    assert_eq!(rule.source, RuleSource::Ai);
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn cached_rule_makes_zero_oracle_calls() {
    let oracle = Arc::new(CountingOracle::answering(Classification::NonBillable, 0.9));
    let p = PipelineBuilder::new().oracle(oracle.clone()).build();
    p.rules.upsert(ClassificationRule::learned("code", Classification::Billable)).await.unwrap();

    for raw in ["code", "Code.exe", "C:\\Apps\\Code.exe", "/usr/share/code/code"] {
        assert_eq!(
            p.resolver.resolve(&AppActivity::new(raw, "main.rs")).await,
            Classification::Billable
        );
    }

    assert_eq!(oracle.calls(), 0);
    assert_eq!(p.resolver.stats().cache_hits, 4);
}

#[tokio::test]
async fn ambiguous_rule_consults_oracle_every_time() {
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.7));
    let p = PipelineBuilder::new().oracle(oracle.clone()).build();
    p.rules.upsert(ClassificationRule::learned("chrome", Classification::Ambiguous)).await.unwrap();

    for _ in 0..3 {
        let r = p.resolver.resolve_detailed(&AppActivity::new("chrome", "Jira board"), None).await;
        assert_eq!(r.source, ResolutionSource::Oracle);
    }

    assert_eq!(oracle.calls(), 3);
    let rule = p.rules.find("chrome").await.unwrap().unwrap();
    assert_eq!(rule.classification, Classification::Ambiguous);
}

#[tokio::test]
async fn resolve_survives_rule_store_outage() {
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.9));
    let p = PipelineBuilder::new().oracle(oracle).build();
    p.rules.set_failing(true);

    let resolved = p.resolver.resolve(&AppActivity::new("figma", "")).await;
    assert_eq!(resolved, Classification::Billable);
}

#[tokio::test]
async fn hung_oracle_times_out_to_non_billable() {
    let oracle = Arc::new(
        CountingOracle::answering(Classification::Billable, 0.9).with_delay(Duration::from_secs(5)),
    );
    let p = PipelineBuilder::new().build();
    let resolver = focusledger_core::ClassificationResolver::new(
        p.rules.clone(),
        p.entries.clone(),
        p.projects.clone(),
        Arc::new(focusledger_core::EntryLocks::new()),
    )
    .with_oracle(oracle)
    .with_oracle_timeout(Duration::from_millis(20));

    let r = resolver.resolve_detailed(&AppActivity::new("figma", ""), None).await;
    assert_eq!(r.classification, Classification::NonBillable);
    assert_eq!(r.source, ResolutionSource::Default);
    assert!(p.rules.find("figma").await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_first_sight_converges_to_one_rule() {
    let oracle = Arc::new(
        CountingOracle::answering(Classification::Billable, 0.9)
            .with_delay(Duration::from_millis(10)),
    );
    let p = PipelineBuilder::new().oracle(oracle.clone()).build();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let resolver = p.resolver.clone();
            tokio::spawn(async move { resolver.resolve(&AppActivity::new("Linear.exe", "")).await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), Classification::Billable);
    }

    let rules = p.rules.list().await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].app_name, "linear");
    assert!(oracle.calls() >= 1);
}

#[tokio::test]
async fn manual_override_restamps_history_and_stops_oracle_calls() {
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.9));
    let p = PipelineBuilder::new().oracle(oracle.clone()).build();
    p.projects.upsert_project("p1", "Apollo", true);
    p.projects.upsert_project("p2", "Internal", false);

    p.aggregator.record_appointment("u1", "p1", None, interval("slack", 0, 600)).await.unwrap();
    p.aggregator.record_appointment("u2", "p2", None, interval("Slack.exe", 0, 300)).await.unwrap();
    p.aggregator.record_appointment("u1", "p1", None, interval("code", 600, 900)).await.unwrap();
    let calls_before = oracle.calls();

    let report = p
        .resolver
        .override_classification(&admin(), "slack", Classification::NonBillable, Some("chat".into()))
        .await
        .unwrap();

    assert_eq!(report.rule.source, RuleSource::Manual);
    assert_eq!(report.entries_updated, 2);
    assert_eq!(report.entries_failed, 0);

    assert_eq!(
        p.resolver.resolve(&AppActivity::new("slack", "")).await,
        Classification::NonBillable
    );
    assert_eq!(oracle.calls(), calls_before);

    for entry in p.entries.all() {
        for appt in entry.appointments.iter().filter(|a| a.app_name == "slack") {
            assert_eq!(appt.suggested_category, Classification::NonBillable);
            assert!(!appt.is_billable);
        }
        for appt in entry.appointments.iter().filter(|a| a.app_name == "code") {
            assert_eq!(appt.suggested_category, Classification::Billable);
        }
    }
}

#[tokio::test]
async fn override_tolerates_partial_restamp_failure() {
    let p = PipelineBuilder::new()
        .oracle(Arc::new(CountingOracle::answering(Classification::Billable, 0.9)))
        .build();
    p.projects.upsert_project("p1", "Apollo", true);
    p.aggregator.record_appointment("u1", "p1", None, interval("slack", 0, 600)).await.unwrap();
    p.entries.set_failing_writes(true);

    let report = p
        .resolver
        .override_classification(&admin(), "slack", Classification::NonBillable, None)
        .await
        .unwrap();

    assert_eq!(report.entries_updated, 0);
    assert_eq!(report.entries_failed, 1);
    assert_eq!(
        p.rules.find("slack").await.unwrap().unwrap().classification,
        Classification::NonBillable
    );
}

#[tokio::test]
async fn ai_never_replaces_manual_rule() {
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.9));
    let p = PipelineBuilder::new().oracle(oracle).build();
    p.resolver
        .override_classification(&admin(), "zoom", Classification::Ambiguous, None)
        .await
        .unwrap();

    // Ambiguous manual rule: oracle answers per occurrence, rule untouched.
    assert_eq!(
        p.resolver.resolve(&AppActivity::new("zoom", "standup")).await,
        Classification::Billable
    );
    let rule = p.rules.find("zoom").await.unwrap().unwrap();
    assert_eq!(rule.source, RuleSource::Manual);
    assert_eq!(rule.classification, Classification::Ambiguous);
}

#[tokio::test]
async fn members_cannot_override() {
    let p = PipelineBuilder::new().build();
    let err = p
        .resolver
        .override_classification(
            &Actor::new("u1", Role::Member),
            "slack",
            Classification::Billable,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
    assert!(p.rules.list().await.unwrap().is_empty());
}

/// Rule store whose next `find` fails once.
#[derive(Default)]
struct FlakyRules {
    inner: InMemoryRuleStore,
    fail_next_find: AtomicBool,
}

#[async_trait]
impl RuleStore for FlakyRules {
    async fn find(&self, app_name: &str) -> Result<Option<ClassificationRule>> {
        if self.fail_next_find.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Database("rule store busy".into()));
        }
        self.inner.find(app_name).await
    }

    async fn upsert(&self, rule: ClassificationRule) -> Result<ClassificationRule> {
        self.inner.upsert(rule).await
    }

    async fn list(&self) -> Result<Vec<ClassificationRule>> {
        self.inner.list().await
    }

    async fn delete(&self, app_name: &str) -> Result<bool> {
        self.inner.delete(app_name).await
    }
}

#[tokio::test]
async fn failed_lookup_answers_without_replacing_the_rule() {
    let rules = Arc::new(FlakyRules::default());
    rules.upsert(ClassificationRule::learned("chrome", Classification::Ambiguous)).await.unwrap();
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.9));
    let resolver = ClassificationResolver::new(
        rules.clone(),
        Arc::new(InMemoryTimeEntryRepository::default()),
        Arc::new(InMemoryProjectDirectory::default()),
        Arc::new(EntryLocks::new()),
    )
    .with_oracle(oracle.clone());

    rules.fail_next_find.store(true, Ordering::SeqCst);
    let resolved = resolver.resolve_detailed(&AppActivity::new("chrome", "Jira"), None).await;

    assert_eq!(resolved.classification, Classification::Billable);
    assert_eq!(resolved.source, ResolutionSource::Oracle);
    assert_eq!(oracle.calls(), 1);
    assert_eq!(resolver.stats().rules_learned, 0);
    let rule = rules.find("chrome").await.unwrap().expect("rule kept");
    assert_eq!(rule.classification, Classification::Ambiguous);
}

#[tokio::test]
async fn failed_lookup_for_unknown_app_learns_on_the_next_call() {
    let rules = Arc::new(FlakyRules::default());
    let oracle = Arc::new(CountingOracle::answering(Classification::NonBillable, 0.8));
    let resolver = ClassificationResolver::new(
        rules.clone(),
        Arc::new(InMemoryTimeEntryRepository::default()),
        Arc::new(InMemoryProjectDirectory::default()),
        Arc::new(EntryLocks::new()),
    )
    .with_oracle(oracle.clone());

    rules.fail_next_find.store(true, Ordering::SeqCst);
    resolver.resolve(&AppActivity::new("steam", "Library")).await;
    assert!(rules.find("steam").await.unwrap().is_none());

    resolver.resolve(&AppActivity::new("steam", "Library")).await;
    let rule = rules.find("steam").await.unwrap().expect("learned once lookup works");
    assert_eq!(rule.classification, Classification::NonBillable);
    assert_eq!(oracle.calls(), 2);
}
