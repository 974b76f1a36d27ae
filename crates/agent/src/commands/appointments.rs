//! Appointment recording

use focusledger_domain::{Appointment, Interval, Result};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

pub async fn record_appointment(
    ctx: &AppContext,
    user_id: &str,
    project_id: &str,
    task_id: Option<String>,
    interval: Interval,
) -> Result<Appointment> {
    execute_command("appointments::record", || async {
        ctx.aggregator.record_appointment(user_id, project_id, task_id, interval).await
    })
    .await
}
