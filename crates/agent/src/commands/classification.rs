//! Classification commands

use focusledger_domain::{
    Actor, AppActivity, Classification, ClassificationRule, OverrideReport, Result,
};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

/// Never fails: oracle trouble degrades to the fallback or the safe default.
pub async fn resolve_classification(
    ctx: &AppContext,
    activity: &AppActivity,
    context: Option<&str>,
) -> Result<Classification> {
    execute_command("classification::resolve", || async {
        Ok(ctx.resolver.resolve_detailed(activity, context).await.classification)
    })
    .await
}

/// Admin-only. Writes a manual rule and re-stamps recorded appointments.
pub async fn override_classification(
    ctx: &AppContext,
    actor: &Actor,
    app_name: &str,
    classification: Classification,
    notes: Option<String>,
) -> Result<OverrideReport> {
    execute_command("classification::override", || async {
        ctx.resolver.override_classification(actor, app_name, classification, notes).await
    })
    .await
}

pub async fn list_classification_rules(ctx: &AppContext) -> Result<Vec<ClassificationRule>> {
    execute_command("classification::list_rules", || async { ctx.resolver.list_rules().await })
        .await
}

pub async fn delete_classification_rule(
    ctx: &AppContext,
    actor: &Actor,
    app_name: &str,
) -> Result<()> {
    execute_command("classification::delete_rule", || async {
        ctx.resolver.delete_rule(actor, app_name).await
    })
    .await
}
