//! Manual sync trigger

use focusledger_core::SyncReport;
use focusledger_domain::Result;
use tracing::warn;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

/// Flushes buffered intervals to the local store, then runs one delivery
/// pass.
pub async fn sync_now(ctx: &AppContext) -> Result<SyncReport> {
    execute_command("sync::sync_now", || async {
        let buffered = ctx.sessions.flush_all().await;
        if buffered > 0 {
            warn!(buffered, "some intervals could not reach the local store");
        }
        ctx.sync_service.sync_once().await
    })
    .await
}
