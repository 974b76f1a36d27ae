//! Tracking session commands

use std::sync::Arc;

use focusledger_core::tracking::{SessionInfo, StopReport};
use focusledger_core::{ActiveWindowProvider, Sampler};
use focusledger_domain::{Interval, LedgerError, Result, Sample};
use focusledger_infra::scheduling::{SamplingLoop, SamplingLoopConfig};
use uuid::Uuid;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

pub async fn start_session(
    ctx: &AppContext,
    user_id: &str,
    project_id: &str,
    task_id: Option<String>,
) -> Result<SessionInfo> {
    execute_command("tracking::start_session", || async {
        ctx.sessions.start_session(user_id, project_id, task_id)
    })
    .await
}

/// Feeds one observation. Returns the interval it finalized, if any.
pub async fn submit_sample(
    ctx: &AppContext,
    session_id: Uuid,
    sample: &Sample,
) -> Result<Option<Interval>> {
    execute_command("tracking::submit_sample", || async {
        ctx.sessions.submit_sample(session_id, sample).await
    })
    .await
}

/// Drives an existing session from `provider` on a timer. `preview` selects
/// the faster UI-preview cadence.
pub async fn start_sampling(
    ctx: &AppContext,
    provider: Arc<dyn ActiveWindowProvider>,
    session_id: Uuid,
    preview: bool,
) -> Result<()> {
    execute_command("tracking::start_sampling", || async {
        if ctx.sessions.session_info(session_id).is_none() {
            return Err(LedgerError::NotFound(format!("session {session_id}")));
        }

        let mut loops = ctx.sampling_loops.lock();
        // Loops end on their own when their session is stopped elsewhere.
        loops.retain(|_, sampling| sampling.is_running());
        if loops.contains_key(&session_id) {
            return Err(LedgerError::InvalidInput(format!("session {session_id} is already sampling")));
        }

        let mut config = SamplingLoopConfig::from(&ctx.config.tracking);
        if preview {
            config.sample_interval = ctx.config.tracking.preview_sample_interval();
        }
        let sampler = Arc::new(Sampler::new(provider, Arc::clone(&ctx.sessions)));
        let mut sampling = SamplingLoop::new(sampler, session_id, config);
        sampling.start()?;
        loops.insert(session_id, sampling);
        Ok(())
    })
    .await
}

/// Finalizes the in-progress interval once and flushes. Stops the session's
/// sampling loop first when one is running.
pub async fn stop_session(ctx: &AppContext, session_id: Uuid) -> Result<StopReport> {
    execute_command("tracking::stop_session", || async {
        let sampling = ctx.sampling_loops.lock().remove(&session_id);
        if let Some(mut sampling) = sampling {
            if sampling.is_running() {
                if let Some(report) = sampling.stop().await? {
                    return Ok(report);
                }
            }
        }
        ctx.sessions.stop_session(session_id).await
    })
    .await
}
