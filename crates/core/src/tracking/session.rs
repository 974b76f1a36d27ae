//! Tracking sessions and the registry hosting them
//!
//! Each session owns its own [`Coalescer`]; sessions never share interval
//! state. Finalized intervals are appended to the [`LocalIntervalStore`] as
//! soon as they are emitted. When the store is unavailable they stay in the
//! session's buffer and are retried on the next sample, the next
//! [`SessionRegistry::flush_all`], or the stop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use focusledger_domain::{Interval, LedgerError, Result, Sample, TrackedInterval};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::coalescer::{Coalescer, CoalescerConfig};
use super::ports::LocalIntervalStore;

/// Who and what a session is tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub user_id: String,
    pub project_id: String,
    pub task_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Result of stopping a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StopReport {
    pub session: SessionInfo,
    /// The in-progress interval, if it survived the stop minimum.
    pub final_interval: Option<Interval>,
    /// Intervals that could not be flushed and were kept for a later retry.
    pub unflushed: usize,
}

/// One coalescer plus its pending output.
#[derive(Debug)]
pub struct TrackingSession {
    info: SessionInfo,
    coalescer: Coalescer,
    unflushed: Vec<TrackedInterval>,
}

impl TrackingSession {
    pub fn new(info: SessionInfo, config: CoalescerConfig) -> Self {
        Self { info, coalescer: Coalescer::new(config), unflushed: Vec::new() }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn coalescer(&self) -> &Coalescer {
        &self.coalescer
    }

    /// Feeds a sample, buffering whatever it finalizes.
    pub fn observe(&mut self, sample: &Sample) -> Option<Interval> {
        let interval = self.coalescer.push(sample)?;
        self.unflushed.push(self.track(interval.clone()));
        Some(interval)
    }

    /// Finalizes the in-progress interval (if long enough) into the buffer.
    pub fn finish(&mut self) -> Option<Interval> {
        let interval = self.coalescer.stop()?;
        self.unflushed.push(self.track(interval.clone()));
        Some(interval)
    }

    pub fn take_unflushed(&mut self) -> Vec<TrackedInterval> {
        std::mem::take(&mut self.unflushed)
    }

    /// Puts a failed flush back in front of anything buffered since.
    pub fn requeue(&mut self, mut intervals: Vec<TrackedInterval>) {
        intervals.append(&mut self.unflushed);
        self.unflushed = intervals;
    }

    pub fn unflushed_len(&self) -> usize {
        self.unflushed.len()
    }

    fn track(&self, interval: Interval) -> TrackedInterval {
        TrackedInterval {
            id: Uuid::now_v7(),
            session_id: self.info.id,
            user_id: self.info.user_id.clone(),
            project_id: self.info.project_id.clone(),
            task_id: self.info.task_id.clone(),
            interval,
            recorded_at: Utc::now(),
        }
    }
}

/// Process-wide set of live tracking sessions.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<Mutex<TrackingSession>>>,
    /// Output of stopped sessions whose final flush failed.
    stranded: Mutex<Vec<TrackedInterval>>,
    store: Arc<dyn LocalIntervalStore>,
    config: CoalescerConfig,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn LocalIntervalStore>, config: CoalescerConfig) -> Self {
        Self { sessions: DashMap::new(), stranded: Mutex::new(Vec::new()), store, config }
    }

    pub fn start_session(
        &self,
        user_id: impl Into<String>,
        project_id: impl Into<String>,
        task_id: Option<String>,
    ) -> Result<SessionInfo> {
        let user_id = user_id.into();
        let project_id = project_id.into();
        if user_id.trim().is_empty() || project_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "a session needs both a user and a project".to_string(),
            ));
        }

        let info = SessionInfo {
            id: Uuid::now_v7(),
            user_id,
            project_id,
            task_id,
            started_at: Utc::now(),
        };
        self.sessions
            .insert(info.id, Arc::new(Mutex::new(TrackingSession::new(info.clone(), self.config))));
        info!(session_id = %info.id, user_id = %info.user_id, project_id = %info.project_id, "tracking session started");
        Ok(info)
    }

    /// Feeds one observation into a session. Only an unknown session is an
    /// error; storage trouble is absorbed and retried later.
    pub async fn submit_sample(&self, session_id: Uuid, sample: &Sample) -> Result<Option<Interval>> {
        let session = self.session(session_id)?;
        let (emitted, batch) = {
            let mut guard = session.lock();
            let emitted = guard.observe(sample);
            (emitted, guard.take_unflushed())
        };
        self.flush_batch(&session, batch).await;
        Ok(emitted)
    }

    /// Finalizes the in-progress interval once, flushes, and forgets the
    /// session.
    pub async fn stop_session(&self, session_id: Uuid) -> Result<StopReport> {
        let (_, session) = self
            .sessions
            .remove(&session_id)
            .ok_or_else(|| LedgerError::NotFound(format!("session {session_id}")))?;

        let (info, final_interval, batch) = {
            let mut guard = session.lock();
            let final_interval = guard.finish();
            (guard.info().clone(), final_interval, guard.take_unflushed())
        };

        let mut unflushed = 0;
        if !batch.is_empty() {
            if let Err(err) = self.store.append(&batch).await {
                unflushed = batch.len();
                warn!(session_id = %session_id, error = %err, count = unflushed, "final flush failed; keeping intervals for retry");
                self.stranded.lock().extend(batch);
            }
        }

        info!(session_id = %session_id, kept_final = final_interval.is_some(), "tracking session stopped");
        Ok(StopReport { session: info, final_interval, unflushed })
    }

    /// Stops every live session. Used on shutdown.
    pub async fn stop_all(&self) -> Vec<StopReport> {
        let ids: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            match self.stop_session(id).await {
                Ok(report) => reports.push(report),
                Err(err) => debug!(session_id = %id, error = %err, "session already stopped"),
            }
        }
        reports
    }

    /// Retries every buffered interval. Returns how many are still buffered.
    pub async fn flush_all(&self) -> usize {
        let stranded = std::mem::take(&mut *self.stranded.lock());
        if !stranded.is_empty() {
            if let Err(err) = self.store.append(&stranded).await {
                warn!(error = %err, count = stranded.len(), "retry of stranded intervals failed");
                let mut guard = self.stranded.lock();
                let newer = std::mem::take(&mut *guard);
                *guard = stranded;
                guard.extend(newer);
            }
        }

        let sessions: Vec<_> = self.sessions.iter().map(|entry| Arc::clone(entry.value())).collect();
        for session in sessions {
            let batch = session.lock().take_unflushed();
            self.flush_batch(&session, batch).await;
        }

        self.buffered()
    }

    pub fn active_sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> =
            self.sessions.iter().map(|entry| entry.value().lock().info().clone()).collect();
        sessions.sort_by_key(|info| info.started_at);
        sessions
    }

    pub fn session_info(&self, session_id: Uuid) -> Option<SessionInfo> {
        self.sessions.get(&session_id).map(|entry| entry.value().lock().info().clone())
    }

    /// Intervals finalized but not yet in the local store.
    pub fn buffered(&self) -> usize {
        let live: usize = self.sessions.iter().map(|entry| entry.value().lock().unflushed_len()).sum();
        live + self.stranded.lock().len()
    }

    fn session(&self, session_id: Uuid) -> Result<Arc<Mutex<TrackingSession>>> {
        self.sessions
            .get(&session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::NotFound(format!("session {session_id}")))
    }

    async fn flush_batch(&self, session: &Arc<Mutex<TrackingSession>>, batch: Vec<TrackedInterval>) {
        if batch.is_empty() {
            return;
        }
        if let Err(err) = self.store.append(&batch).await {
            warn!(error = %err, count = batch.len(), "local flush failed; will retry");
            session.lock().requeue(batch);
        }
    }
}
