//! Fixed-interval scheduler for agent-to-backend interval delivery.
//!
//! Every tick runs one [`IntervalSyncService::sync_once`] pass. Failures are
//! logged and retried on the next tick; nothing is cleared locally unless the
//! whole pass succeeded.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use focusledger_core::IntervalSyncService;
//! use focusledger_infra::scheduling::{SchedulerResult, SyncScheduler, SyncSchedulerConfig};
//!
//! # async fn example(service: Arc<IntervalSyncService>) -> SchedulerResult<()> {
//! let mut scheduler = SyncScheduler::new(
//!     service,
//!     SyncSchedulerConfig { interval: Duration::from_secs(60), ..Default::default() },
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

use focusledger_core::IntervalSyncService;
use focusledger_domain::SyncConfig;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Time between sync passes
    pub interval: Duration,
    /// Timeout for a single sync pass
    pub sync_timeout: Duration,
    /// Timeout for awaiting the loop on stop
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            sync_timeout: Duration::from_secs(120),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SyncConfig> for SyncSchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self { interval: Duration::from_secs(config.interval_seconds.max(1)), ..Self::default() }
    }
}

/// Sync scheduler for periodic local-store delivery
pub struct SyncScheduler {
    service: Arc<IntervalSyncService>,
    config: SyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SyncScheduler {
    pub fn new(service: Arc<IntervalSyncService>, config: SyncSchedulerConfig) -> Self {
        Self {
            service,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawns the background loop.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "Starting sync scheduler");

        // Fresh token so the scheduler can be restarted after stop.
        self.cancellation_token = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(service, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Sync scheduler started");
        Ok(())
    }

    /// Cancels the loop and awaits it.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping sync scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Sync scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn sync_loop(
        service: Arc<IntervalSyncService>,
        config: SyncSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    let started = Instant::now();

                    match tokio::time::timeout(config.sync_timeout, service.sync_once()).await {
                        Ok(Ok(report)) if report.is_complete() => {
                            debug!(
                                transmitted = report.transmitted,
                                cleared = report.cleared,
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "Sync pass finished"
                            );
                        }
                        Ok(Ok(report)) => {
                            warn!(
                                pending = report.pending,
                                failed = report.failed,
                                "Sync pass incomplete; local store kept for next pass"
                            );
                        }
                        Ok(Err(err)) => {
                            error!(error = %err, error_label = err.label(), "Sync pass failed");
                        }
                        Err(_) => {
                            warn!(timeout_secs = config.sync_timeout.as_secs(), "Sync pass timed out");
                        }
                    }
                }
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            warn!("SyncScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use focusledger_core::memory::InMemoryIntervalStore;
    use focusledger_core::{LocalIntervalStore, RemoteIntervalSink};
    use focusledger_domain::{Interval, Result as DomainResult, TrackedInterval};
    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    struct Delivered(std::sync::Mutex<Vec<Uuid>>);

    #[async_trait]
    impl RemoteIntervalSink for Delivered {
        async fn transmit(&self, interval: &TrackedInterval) -> DomainResult<()> {
            self.0.lock().unwrap().push(interval.id);
            Ok(())
        }
    }

    fn tracked() -> TrackedInterval {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        TrackedInterval {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            user_id: "u1".into(),
            project_id: "p1".into(),
            task_id: None,
            interval: Interval::new("Code", "code", start, start + chrono::Duration::seconds(30))
                .unwrap(),
            recorded_at: Utc::now(),
        }
    }

    fn fast_config() -> SyncSchedulerConfig {
        SyncSchedulerConfig {
            interval: Duration::from_millis(20),
            sync_timeout: Duration::from_secs(1),
            join_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn delivers_pending_intervals_on_tick() {
        let store = Arc::new(InMemoryIntervalStore::default());
        store.append(&[tracked(), tracked()]).await.unwrap();
        let sink = Arc::new(Delivered::default());
        let service = Arc::new(IntervalSyncService::new(store.clone(), sink.clone()));

        let mut scheduler = SyncScheduler::new(service, fast_config());
        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert_eq!(sink.0.lock().unwrap().len(), 2);
        assert!(store.pending().await.unwrap().is_empty());
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn double_start_is_rejected_and_restart_works() {
        let store = Arc::new(InMemoryIntervalStore::default());
        let service =
            Arc::new(IntervalSyncService::new(store, Arc::new(Delivered::default())));
        let mut scheduler = SyncScheduler::new(service, fast_config());

        scheduler.start().await.expect("first start");
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));
        scheduler.stop().await.expect("stop");
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start().await.expect("restart");
        scheduler.stop().await.expect("stop again");
    }
}
