//! Application context - dependency injection container

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use focusledger_core::{
    AggregatorSink, AppointmentAggregator, ClassificationResolver, CoalescerConfig, EntryLocks,
    IntervalSyncService, NarrativeTemplate, RemoteIntervalSink, SessionRegistry, SummaryEngine,
};
use focusledger_domain::{Config, LedgerError, Result};
use focusledger_infra::scheduling::{
    NightlyRollup, SamplingLoop, SchedulerError, SummaryJob, SummaryScheduler,
    SummarySchedulerConfig, SyncScheduler, SyncSchedulerConfig,
};
use focusledger_infra::{
    DbManager, HttpIntervalSink, OpenAIClient, SqlIntervalStore, SqlProjectDirectory, SqlRuleStore,
    SqlSummaryRepository, SqlTimeEntryRepository,
};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,

    // Persistence adapters
    pub rules: Arc<SqlRuleStore>,
    pub entries: Arc<SqlTimeEntryRepository>,
    pub projects: Arc<SqlProjectDirectory>,
    pub summaries: Arc<SqlSummaryRepository>,
    pub intervals: Arc<SqlIntervalStore>,

    // Core services
    pub resolver: Arc<ClassificationResolver>,
    pub aggregator: Arc<AppointmentAggregator>,
    pub summary_engine: Arc<SummaryEngine>,
    pub sessions: Arc<SessionRegistry>,
    pub sync_service: Arc<IntervalSyncService>,

    // Schedulers
    pub sync_scheduler: AsyncMutex<SyncScheduler>,
    pub summary_scheduler: AsyncMutex<SummaryScheduler>,

    /// Timer-driven sessions, keyed by session id.
    pub(crate) sampling_loops: Mutex<HashMap<Uuid, SamplingLoop>>,
}

impl AppContext {
    /// Opens the database, applies migrations and wires every service.
    /// Background schedulers are created but not started; see
    /// [`AppContext::start_background`].
    pub fn new(config: Config) -> Result<Self> {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                LedgerError::Config(format!("cannot create database directory {}: {err}", parent.display()))
            })?;
        }

        let db = Arc::new(DbManager::new(db_path, config.database.pool_size)?);
        db.run_migrations()?;
        db.health_check()?;

        let rules = Arc::new(SqlRuleStore::new(Arc::clone(&db)));
        let entries = Arc::new(SqlTimeEntryRepository::new(Arc::clone(&db)));
        let projects = Arc::new(SqlProjectDirectory::new(Arc::clone(&db)));
        let summaries = Arc::new(SqlSummaryRepository::new(Arc::clone(&db)));
        let intervals = Arc::new(SqlIntervalStore::new(Arc::clone(&db)));
        let locks = Arc::new(EntryLocks::new());

        let oracle = if config.oracle.is_configured() {
            info!(model = %config.oracle.model, "classification and narrative oracle enabled");
            Some(Arc::new(OpenAIClient::from_config(&config.oracle)?))
        } else {
            info!("no oracle key configured; using keyword classifier and template narratives");
            None
        };
        let oracle_timeout = Duration::from_secs(config.oracle.timeout_secs.max(1));

        let mut resolver = ClassificationResolver::new(
            rules.clone(),
            entries.clone(),
            projects.clone(),
            Arc::clone(&locks),
        )
        .with_oracle_timeout(oracle_timeout);
        let mut summary_engine = SummaryEngine::new(entries.clone(), projects.clone(), summaries.clone())
            .with_template(NarrativeTemplate::new(config.summary.top_apps))
            .with_narrative_timeout(oracle_timeout);
        if let Some(oracle) = oracle {
            resolver = resolver.with_oracle(oracle.clone());
            summary_engine = summary_engine.with_narrator(oracle);
        }

        let resolver = Arc::new(resolver);
        let summary_engine = Arc::new(summary_engine);
        let aggregator = Arc::new(AppointmentAggregator::new(
            entries.clone(),
            projects.clone(),
            Arc::clone(&resolver),
            locks,
        ));

        let sessions =
            Arc::new(SessionRegistry::new(intervals.clone(), CoalescerConfig::from(&config.tracking)));

        let sink: Arc<dyn RemoteIntervalSink> = match HttpIntervalSink::from_config(&config.sync)? {
            Some(http_sink) => {
                info!(endpoint = http_sink.endpoint(), "intervals are delivered over HTTP");
                Arc::new(http_sink)
            }
            None => Arc::new(AggregatorSink::new(Arc::clone(&aggregator))),
        };
        let sync_service = Arc::new(IntervalSyncService::new(intervals.clone(), sink));

        let sync_scheduler =
            SyncScheduler::new(Arc::clone(&sync_service), SyncSchedulerConfig::from(&config.sync));
        let rollup: Arc<dyn SummaryJob> =
            Arc::new(NightlyRollup::new(Arc::clone(&summary_engine), projects.clone()));
        let summary_scheduler =
            SummaryScheduler::with_config(SummarySchedulerConfig::from(&config.summary), rollup);

        info!(db_path = %db.path().display(), "application context ready");

        Ok(Self {
            config,
            db,
            rules,
            entries,
            projects,
            summaries,
            intervals,
            resolver,
            aggregator,
            summary_engine,
            sessions,
            sync_service,
            sync_scheduler: AsyncMutex::new(sync_scheduler),
            summary_scheduler: AsyncMutex::new(summary_scheduler),
            sampling_loops: Mutex::new(HashMap::new()),
        })
    }

    /// Starts the sync scheduler (when enabled) and the nightly roll-up.
    pub async fn start_background(&self) -> Result<()> {
        if self.config.sync.enabled {
            self.sync_scheduler.lock().await.start().await?;
        } else {
            info!("sync disabled; intervals stay in the local store");
        }
        self.summary_scheduler.lock().await.start().await?;
        Ok(())
    }

    /// Sessions that currently hold a sampling loop, finished or not.
    pub fn sampling_session_ids(&self) -> Vec<Uuid> {
        self.sampling_loops.lock().keys().copied().collect()
    }

    /// Stops every session (flushing once), delivers what is pending, and
    /// stops the schedulers.
    pub async fn shutdown(&self) -> Result<()> {
        let loops: Vec<SamplingLoop> = self.sampling_loops.lock().drain().map(|(_, l)| l).collect();
        for mut sampling in loops {
            if let Err(err) = sampling.stop().await {
                warn!(session_id = %sampling.session_id(), error = %err, "sampling loop did not stop cleanly");
            }
        }

        let stopped = self.sessions.stop_all().await;
        let buffered = self.sessions.flush_all().await;
        info!(sessions = stopped.len(), buffered, "tracking sessions stopped");

        if self.config.sync.enabled {
            match self.sync_service.sync_once().await {
                Ok(report) => info!(transmitted = report.transmitted, failed = report.failed, "final sync"),
                Err(err) => warn!(error = %err, "final sync failed; intervals kept locally"),
            }
        }

        ignore_not_running(self.sync_scheduler.lock().await.stop().await)?;
        ignore_not_running(self.summary_scheduler.lock().await.stop().await)?;

        info!("application context shut down");
        Ok(())
    }
}

fn ignore_not_running(result: std::result::Result<(), SchedulerError>) -> Result<()> {
    match result {
        Ok(()) | Err(SchedulerError::NotRunning) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
