//! One sampling tick: poll the focused window, feed the session.
//!
//! The timer lives elsewhere (see the infra sampling loop); ticks here are
//! explicit so the whole pipeline can be driven with synthetic time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use focusledger_domain::{Interval, Result, Sample};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ports::ActiveWindowProvider;
use super::session::SessionRegistry;

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing focused; no sample taken.
    Idle,
    /// A sample was fed to the session.
    Sampled { emitted: Option<Interval> },
    /// The window provider failed; retried on the next tick.
    ProviderUnavailable,
}

pub struct Sampler {
    provider: Arc<dyn ActiveWindowProvider>,
    registry: Arc<SessionRegistry>,
}

impl Sampler {
    pub fn new(provider: Arc<dyn ActiveWindowProvider>, registry: Arc<SessionRegistry>) -> Self {
        Self { provider, registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub async fn tick(&self, session_id: Uuid) -> Result<TickOutcome> {
        self.tick_at(session_id, Utc::now()).await
    }

    /// Samples with an explicit timestamp. Errors only when the session is
    /// unknown.
    pub async fn tick_at(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<TickOutcome> {
        let window = match self.provider.active_window().await {
            Ok(Some(window)) => window,
            Ok(None) => {
                debug!(session_id = %session_id, "no focused window");
                return Ok(TickOutcome::Idle);
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "active window query failed");
                return Ok(TickOutcome::ProviderUnavailable);
            }
        };

        let sample = Sample::from_window(window, now);
        let emitted = self.registry.submit_sample(session_id, &sample).await?;
        Ok(TickOutcome::Sampled { emitted })
    }
}
