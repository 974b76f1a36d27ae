//! Summary roll-up commands

use chrono::NaiveDate;
use focusledger_domain::{Result, Summary, SummaryKind};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

pub async fn build_daily_summary(ctx: &AppContext, user_id: &str, date: NaiveDate) -> Result<Summary> {
    execute_command("summary::build_daily", || async {
        ctx.summary_engine.build_daily_summary(user_id, date).await
    })
    .await
}

pub async fn build_manager_summary(
    ctx: &AppContext,
    project_id: &str,
    date: NaiveDate,
) -> Result<Summary> {
    execute_command("summary::build_manager", || async {
        ctx.summary_engine.build_manager_summary(project_id, date).await
    })
    .await
}

pub async fn get_summary(
    ctx: &AppContext,
    kind: SummaryKind,
    subject_id: &str,
    date: NaiveDate,
) -> Result<Option<Summary>> {
    execute_command("summary::get", || async {
        ctx.summary_engine.find_summary(kind, subject_id, date).await
    })
    .await
}
