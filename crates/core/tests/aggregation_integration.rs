//! Appointment aggregation and billability.

mod support;

use std::sync::Arc;

use focusledger_core::TimeEntryRepository;
use focusledger_domain::{Classification, LedgerError};
use support::oracles::CountingOracle;
use support::{interval, PipelineBuilder};

#[tokio::test]
async fn intervals_for_same_app_share_one_appointment_and_one_resolution() {
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.9));
    let p = PipelineBuilder::new().oracle(oracle.clone()).build();
    p.projects.upsert_project("p1", "Apollo", true);

    p.aggregator.record_appointment("u1", "p1", Some("T-7".into()), interval("Code.exe", 0, 60)).await.unwrap();
    let appt = p
        .aggregator
        .record_appointment("u1", "p1", None, interval("code", 120, 60))
        .await
        .unwrap();

    assert_eq!(appt.time_intervals.len(), 2);
    assert_eq!(appt.task_id.as_deref(), Some("T-7"));
    assert_eq!(appt.app_name, "code");
    assert_eq!(oracle.calls(), 1);

    let entry = p.entries.find_entry("u1", "p1").await.unwrap().unwrap();
    assert_eq!(entry.appointments.len(), 1);
}

#[tokio::test]
async fn is_billable_requires_billable_project() {
    let p = PipelineBuilder::new()
        .oracle(Arc::new(CountingOracle::answering(Classification::Billable, 0.9)))
        .build();
    p.projects.upsert_project("paid", "Client", true);
    p.projects.upsert_project("internal", "Ops", false);

    let paid = p.aggregator.record_appointment("u1", "paid", None, interval("code", 0, 60)).await.unwrap();
    let internal =
        p.aggregator.record_appointment("u1", "internal", None, interval("code", 0, 60)).await.unwrap();

    assert_eq!(paid.suggested_category, Classification::Billable);
    assert!(paid.is_billable);
    assert_eq!(internal.suggested_category, Classification::Billable);
    assert!(!internal.is_billable);
}

#[tokio::test]
async fn project_flag_is_read_at_write_time() {
    let p = PipelineBuilder::new()
        .oracle(Arc::new(CountingOracle::answering(Classification::Billable, 0.9)))
        .build();
    p.projects.upsert_project("p1", "Apollo", false);

    let first = p.aggregator.record_appointment("u1", "p1", None, interval("code", 0, 60)).await.unwrap();
    assert!(!first.is_billable);

    p.projects.set_billable("p1", true);
    let second = p.aggregator.record_appointment("u1", "p1", None, interval("code", 100, 60)).await.unwrap();
    assert!(second.is_billable);
}

#[tokio::test]
async fn non_billable_activity_is_never_billable() {
    let p = PipelineBuilder::new()
        .oracle(Arc::new(CountingOracle::answering(Classification::NonBillable, 0.9)))
        .build();
    p.projects.upsert_project("p1", "Apollo", true);

    let appt = p.aggregator.record_appointment("u1", "p1", None, interval("steam", 0, 60)).await.unwrap();
    assert!(!appt.is_billable);
}

#[tokio::test]
async fn redelivered_interval_is_not_duplicated() {
    let p = PipelineBuilder::new().build();
    p.projects.upsert_project("p1", "Apollo", true);

    let iv = interval("code", 0, 60);
    p.aggregator.record_appointment("u1", "p1", None, iv.clone()).await.unwrap();
    let again = p.aggregator.record_appointment("u1", "p1", None, iv).await.unwrap();

    assert_eq!(again.time_intervals.len(), 1);
}

#[tokio::test]
async fn new_day_opens_new_appointment() {
    let oracle = Arc::new(CountingOracle::answering(Classification::Billable, 0.9));
    let p = PipelineBuilder::new().oracle(oracle.clone()).build();
    p.projects.upsert_project("p1", "Apollo", true);

    p.aggregator.record_appointment("u1", "p1", None, interval("code", 0, 60)).await.unwrap();
    p.aggregator
        .record_appointment("u1", "p1", None, interval("code", 24 * 3600, 60))
        .await
        .unwrap();

    let entry = p.entries.find_entry("u1", "p1").await.unwrap().unwrap();
    assert_eq!(entry.appointments.len(), 2);
    // Second appointment hits the learned rule.
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn concurrent_writers_to_one_entry_lose_nothing() {
    let p = PipelineBuilder::new().build();
    p.projects.upsert_project("p1", "Apollo", true);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let aggregator = p.aggregator.clone();
            let app = if i % 2 == 0 { "code" } else { "slack" };
            tokio::spawn(async move {
                aggregator.record_appointment("u1", "p1", None, interval(app, i * 100, 50)).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let entry = p.entries.find_entry("u1", "p1").await.unwrap().unwrap();
    let total: usize = entry.appointments.iter().map(|a| a.time_intervals.len()).sum();
    assert_eq!(entry.appointments.len(), 2);
    assert_eq!(total, 20);
}

#[tokio::test]
async fn persistence_failure_is_surfaced() {
    let p = PipelineBuilder::new().build();
    p.entries.set_failing(true);

    let err = p
        .aggregator
        .record_appointment("u1", "p1", None, interval("code", 0, 60))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Database(_)));
}

#[tokio::test]
async fn batch_records_in_order() {
    let p = PipelineBuilder::new().build();
    p.projects.upsert_project("p1", "Apollo", true);

    let appointments = p
        .aggregator
        .record_batch(
            "u1",
            "p1",
            None,
            vec![interval("code", 0, 60), interval("slack", 60, 60), interval("code", 120, 60)],
        )
        .await
        .unwrap();

    assert_eq!(appointments.len(), 3);
    assert_eq!(appointments[2].time_intervals.len(), 2);
}

#[tokio::test]
async fn missing_user_or_project_is_rejected() {
    let p = PipelineBuilder::new().build();
    let err = p
        .aggregator
        .record_appointment("", "p1", None, interval("code", 0, 60))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}
