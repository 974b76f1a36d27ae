//! Command layer over a real SQLite-backed context.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use focusledger_agent::commands::{
    add_project_member, build_daily_summary, build_manager_summary, delete_classification_rule,
    get_summary, list_classification_rules, override_classification, record_appointment,
    remove_project_member, resolve_classification, start_sampling, start_session, stop_session,
    submit_sample, sync_now, upsert_project,
};
use focusledger_agent::AppContext;
use focusledger_core::{LocalIntervalStore, TimeEntryRepository};
use focusledger_domain::{
    Actor, AppActivity, Classification, Interval, LedgerError, Project, Role, RuleSource,
    SummaryKind,
};
use support::{at, create_test_context, create_test_context_with, morning_samples, ScriptedWindow};

fn admin() -> Actor {
    Actor::new("root", Role::Admin)
}

async fn seed_project(ctx: &AppContext, id: &str, billable: bool, members: &[&str]) {
    let project = Project { id: id.into(), name: format!("Project {id}"), billable };
    upsert_project(ctx, &admin(), &project).await.expect("project upsert");
    for member in members {
        add_project_member(ctx, &admin(), id, member).await.expect("member added");
    }
}

#[tokio::test]
async fn tracked_session_flows_into_appointments_and_summary() {
    let (ctx, _dir) = create_test_context();
    seed_project(&ctx, "p1", true, &["alice"]).await;

    let session = start_session(&ctx, "alice", "p1", Some("T-1".into())).await.expect("session");
    let mut emitted = Vec::new();
    for sample in morning_samples() {
        if let Some(interval) = submit_sample(&ctx, session.id, &sample).await.expect("sample") {
            emitted.push(interval);
        }
    }
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].app_name, "Code");

    let report = stop_session(&ctx, session.id).await.expect("stop");
    let last = report.final_interval.expect("final interval kept");
    assert_eq!(last.app_name, "Mail");
    assert_eq!(report.unflushed, 0);

    let sync = sync_now(&ctx).await.expect("sync");
    assert_eq!(sync.pending, 2);
    assert!(sync.is_complete());
    assert!(ctx.intervals.pending().await.unwrap().is_empty());

    let entry = ctx.entries.find_entry("alice", "p1").await.unwrap().expect("entry");
    assert_eq!(entry.appointments.len(), 2);
    let code = entry.appointments.iter().find(|a| a.app_name == "code").expect("code");
    assert!(code.is_billable);
    assert_eq!(code.task_id.as_deref(), Some("T-1"));
    let mail = entry.appointments.iter().find(|a| a.app_name == "mail").expect("mail");
    assert_eq!(mail.suggested_category, Classification::Ambiguous);

    let date = at(0, 0, 0).date_naive();
    let daily = build_daily_summary(&ctx, "alice", date).await.expect("daily");
    assert!((daily.billable_seconds() - 600.0).abs() < 1e-6);
    let stored = get_summary(&ctx, SummaryKind::DailyUser, "alice", date).await.expect("lookup");
    assert_eq!(stored.expect("stored").items, daily.items);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (ctx, _dir) = create_test_context();
    let missing = uuid::Uuid::now_v7();

    let sample = &morning_samples()[0];
    assert!(matches!(submit_sample(&ctx, missing, sample).await, Err(LedgerError::NotFound(_))));
    assert!(matches!(stop_session(&ctx, missing).await, Err(LedgerError::NotFound(_))));
}

#[tokio::test]
async fn override_is_admin_only_and_restamps_history() {
    let (ctx, _dir) = create_test_context();
    seed_project(&ctx, "p1", true, &["alice", "bob"]).await;
    let start = at(14, 0, 0);
    for user in ["alice", "bob"] {
        let interval = Interval::new("Home", "Reddit", start, start + chrono::Duration::minutes(5))
            .expect("interval");
        let appointment = record_appointment(&ctx, user, "p1", None, interval).await.expect("recorded");
        assert!(!appointment.is_billable);
    }

    let member = Actor::new("alice", Role::Member);
    let denied =
        override_classification(&ctx, &member, "Reddit", Classification::Billable, None).await;
    assert!(matches!(denied, Err(LedgerError::Forbidden(_))));

    let report = override_classification(
        &ctx,
        &admin(),
        "Reddit.exe",
        Classification::Billable,
        Some("client research".into()),
    )
    .await
    .expect("override");
    assert_eq!(report.rule.app_name, "reddit");
    assert_eq!(report.entries_updated, 2);
    for user in ["alice", "bob"] {
        let entry = ctx.entries.find_entry(user, "p1").await.unwrap().unwrap();
        assert!(entry.appointments.iter().all(|a| a.is_billable));
    }

    let rules = list_classification_rules(&ctx).await.expect("rules");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].source, RuleSource::Manual);

    let activity = AppActivity::new("reddit", "Home");
    assert_eq!(
        resolve_classification(&ctx, &activity, None).await.expect("resolve"),
        Classification::Billable
    );

    assert!(matches!(
        delete_classification_rule(&ctx, &member, "reddit").await,
        Err(LedgerError::Forbidden(_))
    ));
    delete_classification_rule(&ctx, &admin(), "reddit").await.expect("delete");
    assert!(matches!(
        delete_classification_rule(&ctx, &admin(), "reddit").await,
        Err(LedgerError::NotFound(_))
    ));
    assert_eq!(
        resolve_classification(&ctx, &activity, None).await.expect("resolve"),
        Classification::NonBillable
    );
}

#[tokio::test]
async fn project_administration_requires_admin() {
    let (ctx, _dir) = create_test_context();
    let member = Actor::new("bob", Role::Manager);
    let project = Project { id: "p9".into(), name: "Nine".into(), billable: true };

    assert!(matches!(upsert_project(&ctx, &member, &project).await, Err(LedgerError::Forbidden(_))));
    assert!(matches!(
        add_project_member(&ctx, &member, "p9", "bob").await,
        Err(LedgerError::Forbidden(_))
    ));
}

#[tokio::test]
async fn manager_summary_lists_every_member() {
    let (ctx, _dir) = create_test_context();
    seed_project(&ctx, "p1", true, &["alice", "bob", "carol"]).await;
    assert!(remove_project_member(&ctx, &admin(), "p1", "carol").await.expect("removed"));
    assert!(!remove_project_member(&ctx, &admin(), "p1", "carol").await.expect("no-op"));
    let start = at(10, 0, 0);
    let end = start + chrono::Duration::hours(1);
    record_appointment(&ctx, "bob", "p1", None, Interval::new("lib.rs", "Code", start, end).unwrap())
        .await
        .unwrap();

    let summary = build_manager_summary(&ctx, "p1", start.date_naive()).await.expect("manager");
    let members: Vec<_> =
        summary.member_reports.as_ref().expect("members").iter().map(|m| m.user_id.clone()).collect();
    assert_eq!(members, vec!["alice".to_string(), "bob".to_string()]);
    assert!((summary.billable_seconds() - 3_600.0).abs() < 1e-6);
}

#[tokio::test(flavor = "multi_thread")]
async fn sampling_loop_is_stopped_with_the_session() {
    let (ctx, _dir) = create_test_context_with(|config| {
        config.tracking.sample_interval_ms = 5;
        config.tracking.noise_threshold_secs = 0.0;
        config.tracking.min_final_interval_secs = 0.0;
    });
    let provider = Arc::new(ScriptedWindow::default());
    let session = start_session(&ctx, "alice", "p1", None).await.expect("session");

    start_sampling(&ctx, provider.clone(), session.id, false).await.expect("sampling");
    assert!(matches!(
        start_sampling(&ctx, provider.clone(), session.id, false).await,
        Err(LedgerError::InvalidInput(_))
    ));
    tokio::time::sleep(Duration::from_millis(80)).await;

    let report = stop_session(&ctx, session.id).await.expect("stop");
    assert!(provider.polls.load(Ordering::SeqCst) > 1);
    let last = report.final_interval.expect("final interval");
    assert_eq!(last.app_name, "Code");
    assert!(ctx.sessions.session_info(session.id).is_none());

    let missing = uuid::Uuid::now_v7();
    assert!(matches!(
        start_sampling(&ctx, provider, missing, true).await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn finished_sampling_loops_are_dropped_on_the_next_start() {
    let (ctx, _dir) = create_test_context_with(|config| {
        config.tracking.sample_interval_ms = 5;
    });
    let provider = Arc::new(ScriptedWindow::default());
    let first = start_session(&ctx, "alice", "p1", None).await.expect("first session");
    start_sampling(&ctx, provider.clone(), first.id, false).await.expect("first sampling");

    // Stopping through the registry ends the loop without removing it.
    ctx.sessions.stop_session(first.id).await.expect("stop first");
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(ctx.sampling_session_ids(), vec![first.id]);

    let second = start_session(&ctx, "bob", "p1", None).await.expect("second session");
    start_sampling(&ctx, provider, second.id, false).await.expect("second sampling");

    assert_eq!(ctx.sampling_session_ids(), vec![second.id]);
    stop_session(&ctx, second.id).await.expect("stop second");
}
