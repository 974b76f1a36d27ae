//! Project directory administration

use focusledger_domain::{Actor, LedgerError, Project, Result};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

fn ensure_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LedgerError::Forbidden("only admins may manage projects".to_string()))
    }
}

pub async fn upsert_project(ctx: &AppContext, actor: &Actor, project: &Project) -> Result<()> {
    execute_command("projects::upsert", || async {
        ensure_admin(actor)?;
        ctx.projects.upsert_project(project).await
    })
    .await
}

pub async fn add_project_member(
    ctx: &AppContext,
    actor: &Actor,
    project_id: &str,
    user_id: &str,
) -> Result<()> {
    execute_command("projects::add_member", || async {
        ensure_admin(actor)?;
        ctx.projects.add_member(project_id, user_id).await
    })
    .await
}

/// Returns whether the user was a member.
pub async fn remove_project_member(
    ctx: &AppContext,
    actor: &Actor,
    project_id: &str,
    user_id: &str,
) -> Result<bool> {
    execute_command("projects::remove_member", || async {
        ensure_admin(actor)?;
        ctx.projects.remove_member(project_id, user_id).await
    })
    .await
}
