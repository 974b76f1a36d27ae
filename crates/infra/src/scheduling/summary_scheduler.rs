//! Cron-driven nightly summary roll-up.
//!
//! [`SummaryScheduler`] owns a `tokio-cron-scheduler` instance and fires a
//! [`SummaryJob`] on `summary.cron_expression`. The stock job,
//! [`NightlyRollup`], first retries summary writes that failed earlier and
//! then rebuilds every daily-user and manager summary for the previous UTC
//! day. Rebuilding is safe because summaries are upserted by
//! `(kind, subject, date)`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use focusledger_infra::scheduling::{
//!     SchedulerResult, SummaryJob, SummaryScheduler, SummarySchedulerConfig,
//! };
//!
//! # async fn example(job: Arc<dyn SummaryJob>) -> SchedulerResult<()> {
//! let mut scheduler = SummaryScheduler::with_config(
//!     SummarySchedulerConfig { cron_expression: "0 5 0 * * *".into(), ..Default::default() },
//!     job,
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use focusledger_core::{ProjectDirectory, SummaryEngine};
use focusledger_domain::{Result as DomainResult, SummaryConfig};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Work fired on every cron tick.
#[async_trait]
pub trait SummaryJob: Send + Sync {
    async fn run(&self) -> DomainResult<()>;
}

/// Outcome of one roll-up pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollupReport {
    pub date: Option<NaiveDate>,
    pub retried_writes: usize,
    pub daily_built: usize,
    pub manager_built: usize,
    pub failed: usize,
}

/// Rebuilds all summaries for a day.
pub struct NightlyRollup {
    engine: Arc<SummaryEngine>,
    projects: Arc<dyn ProjectDirectory>,
}

impl NightlyRollup {
    pub fn new(engine: Arc<SummaryEngine>, projects: Arc<dyn ProjectDirectory>) -> Self {
        Self { engine, projects }
    }

    /// Builds every daily-user and manager summary for `date`. Individual
    /// failures are counted, not propagated; only directory reads abort.
    #[instrument(skip(self))]
    pub async fn run_for(&self, date: NaiveDate) -> DomainResult<RollupReport> {
        let mut report = RollupReport { date: Some(date), ..RollupReport::default() };

        match self.engine.retry_pending_writes().await {
            Ok(written) => report.retried_writes = written,
            Err(err) => warn!(error = %err, "pending summary writes still failing"),
        }

        for user_id in self.projects.list_users().await? {
            match self.engine.build_daily_summary(&user_id, date).await {
                Ok(_) => report.daily_built += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(user_id = %user_id, error = %err, "daily summary failed");
                }
            }
        }

        for project in self.projects.list_projects().await? {
            match self.engine.build_manager_summary(&project.id, date).await {
                Ok(_) => report.manager_built += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(project_id = %project.id, error = %err, "manager summary failed");
                }
            }
        }

        info!(
            daily = report.daily_built,
            manager = report.manager_built,
            failed = report.failed,
            "summary roll-up finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl SummaryJob for NightlyRollup {
    async fn run(&self) -> DomainResult<()> {
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);
        self.run_for(yesterday).await.map(|_| ())
    }
}

/// Configuration for the summary scheduler.
#[derive(Debug, Clone)]
pub struct SummarySchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    /// Timeout applied to a single job execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for SummarySchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 5 0 * * *".into(), // 00:05 UTC
            job_timeout: Duration::from_secs(1800),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SummaryConfig> for SummarySchedulerConfig {
    fn from(config: &SummaryConfig) -> Self {
        Self { cron_expression: config.cron_expression.clone(), ..Self::default() }
    }
}

/// Summary scheduler with explicit lifecycle management.
pub struct SummaryScheduler {
    scheduler: Arc<RwLock<Option<JobScheduler>>>,
    config: SummarySchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    job: Arc<dyn SummaryJob>,
}

impl SummaryScheduler {
    pub fn new(cron_expression: String, job: Arc<dyn SummaryJob>) -> Self {
        let config = SummarySchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, job)
    }

    pub fn with_config(config: SummarySchedulerConfig, job: Arc<dyn SummaryJob>) -> Self {
        Self {
            scheduler: Arc::new(RwLock::new(None)),
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            job,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
            .map_err(|source| SchedulerError::StartFailed { source })?;

        *self.scheduler.write().await = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Summary scheduler monitor cancelled");
        }));

        info!(cron = %self.config.cron_expression, "Summary scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let Some(mut scheduler) = self.scheduler.write().await.take() else {
            return Err(SchedulerError::NotRunning);
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
            .map_err(|source| SchedulerError::StopFailed { source })?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Summary scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed { source })?;
        let job = self.job.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let job = job.clone();

            Box::pin(async move {
                let started = Instant::now();
                match tokio::time::timeout(job_timeout, job.run()).await {
                    Ok(Ok(())) => {
                        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Summary job finished");
                    }
                    Ok(Err(err)) => {
                        error!(error = %err, error_label = err.label(), "Summary job failed");
                    }
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "Summary job timed out");
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::InvalidConfig(format!(
            "cron expression {:?}: {source}",
            self.config.cron_expression
        )))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered summary job");
        Ok(scheduler)
    }
}

impl Drop for SummaryScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SummaryScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
