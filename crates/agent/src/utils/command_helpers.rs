//! Command execution helpers
//!
//! Every command goes through [`execute_command`] so timing and outcome
//! logging stay uniform.

use std::future::Future;
use std::time::Instant;

use focusledger_domain::Result as DomainResult;

use crate::utils::logging::log_command_execution;

/// Runs `command_fn`, then logs its duration and outcome under `command_name`.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn my_command(ctx: &AppContext, id: &str) -> Result<Thing> {
///     execute_command("module::my_command", || async {
///         ctx.some_service.do_something(id).await
///     })
///     .await
/// }
/// ```
pub async fn execute_command<F, Fut, T>(command_name: &str, command_fn: F) -> DomainResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();
    let result = command_fn().await;

    let error_label = result.as_ref().err().map(|err| err.label());
    log_command_execution(command_name, start.elapsed(), result.is_ok(), error_label);

    result
}
