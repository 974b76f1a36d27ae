//! Local-flush / remote-sync
//!
//! The local store is cleared only after every pending interval was
//! transmitted. A partial failure leaves it untouched for the next cycle.

use std::sync::Arc;

use focusledger_domain::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ports::RemoteIntervalSink;
use crate::tracking::ports::LocalIntervalStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub pending: usize,
    pub transmitted: usize,
    pub failed: usize,
    pub cleared: usize,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

pub struct IntervalSyncService {
    store: Arc<dyn LocalIntervalStore>,
    sink: Arc<dyn RemoteIntervalSink>,
}

impl IntervalSyncService {
    pub fn new(store: Arc<dyn LocalIntervalStore>, sink: Arc<dyn RemoteIntervalSink>) -> Self {
        Self { store, sink }
    }

    /// One delivery pass. Errors only when the local store itself cannot be
    /// read or cleared; transmission failures are reported in the result.
    pub async fn sync_once(&self) -> Result<SyncReport> {
        let pending = self.store.pending().await?;
        if pending.is_empty() {
            debug!("nothing to sync");
            return Ok(SyncReport::default());
        }

        let mut report = SyncReport { pending: pending.len(), ..SyncReport::default() };
        let mut delivered: Vec<Uuid> = Vec::with_capacity(pending.len());
        for tracked in &pending {
            match self.sink.transmit(tracked).await {
                Ok(()) => {
                    report.transmitted += 1;
                    delivered.push(tracked.id);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(interval_id = %tracked.id, error = %err, "interval transmission failed");
                }
            }
        }

        if report.failed > 0 {
            warn!(
                pending = report.pending,
                failed = report.failed,
                "sync incomplete; local intervals kept for retry"
            );
            return Ok(report);
        }

        report.cleared = self.store.clear(&delivered).await?;
        info!(transmitted = report.transmitted, cleared = report.cleared, "sync complete");
        Ok(report)
    }
}
