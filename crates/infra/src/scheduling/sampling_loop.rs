//! Timer that drives a tracking session.
//!
//! One loop per session: every `sample_interval` it asks the [`Sampler`] for
//! a tick, and every `flush_interval` it retries buffered intervals into the
//! local store. Cancelling the loop stops the session, which finalizes the
//! in-progress interval exactly once.

use std::sync::Arc;
use std::time::Duration;

use focusledger_core::tracking::StopReport;
use focusledger_core::{Sampler, TickOutcome};
use focusledger_domain::TrackingConfig;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

#[derive(Debug, Clone)]
pub struct SamplingLoopConfig {
    pub sample_interval: Duration,
    pub flush_interval: Duration,
    pub join_timeout: Duration,
}

impl Default for SamplingLoopConfig {
    fn default() -> Self {
        Self::from(&TrackingConfig::default())
    }
}

impl From<&TrackingConfig> for SamplingLoopConfig {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            sample_interval: config.sample_interval(),
            flush_interval: Duration::from_secs(config.flush_interval_secs.max(1)),
            join_timeout: Duration::from_secs(5),
        }
    }
}

pub struct SamplingLoop {
    sampler: Arc<Sampler>,
    session_id: Uuid,
    config: SamplingLoopConfig,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<Option<StopReport>>>,
}

impl SamplingLoop {
    pub fn new(sampler: Arc<Sampler>, session_id: Uuid, config: SamplingLoopConfig) -> Self {
        Self {
            sampler,
            session_id,
            config,
            cancellation: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.config.sample_interval.is_zero() || self.config.flush_interval.is_zero() {
            return Err(SchedulerError::InvalidConfig("sampling intervals must be non-zero".into()));
        }

        self.cancellation = CancellationToken::new();
        let sampler = Arc::clone(&self.sampler);
        let config = self.config.clone();
        let cancel = self.cancellation.clone();
        let session_id = self.session_id;

        self.handle =
            Some(tokio::spawn(async move { Self::run(sampler, session_id, config, cancel).await }));

        info!(
            sample_interval_ms = self.config.sample_interval.as_millis() as u64,
            "Sampling loop started"
        );
        Ok(())
    }

    /// Cancels the loop and returns the session's stop report. `None` when
    /// the session had already been stopped elsewhere.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn stop(&mut self) -> SchedulerResult<Option<StopReport>> {
        let Some(handle) = self.handle.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();
        let join_timeout = self.config.join_timeout;
        let report = tokio::time::timeout(join_timeout, handle)
            .await
            .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;

        info!("Sampling loop stopped");
        Ok(report)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn run(
        sampler: Arc<Sampler>,
        session_id: Uuid,
        config: SamplingLoopConfig,
        cancel: CancellationToken,
    ) -> Option<StopReport> {
        let mut sample_tick = tokio::time::interval(config.sample_interval);
        sample_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut flush_tick = tokio::time::interval(config.flush_interval);
        flush_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        flush_tick.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sample_tick.tick() => {
                    match sampler.tick(session_id).await {
                        Ok(TickOutcome::Sampled { emitted: Some(interval) }) => {
                            debug!(app = %interval.app_name, secs = interval.duration_seconds, "interval emitted");
                        }
                        Ok(_) => {}
                        Err(err) => {
                            // Session stopped out from under us.
                            debug!(error = %err, "sampling loop exiting");
                            return None;
                        }
                    }
                }
                _ = flush_tick.tick() => {
                    let buffered = sampler.registry().flush_all().await;
                    if buffered > 0 {
                        warn!(buffered, "intervals still waiting for the local store");
                    }
                }
            }
        }

        match sampler.registry().stop_session(session_id).await {
            Ok(report) => Some(report),
            Err(err) => {
                debug!(error = %err, "session already stopped");
                None
            }
        }
    }
}

impl Drop for SamplingLoop {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(session_id = %self.session_id, "SamplingLoop dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}
