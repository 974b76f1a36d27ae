//! FocusLedger - activity tracking and billable-time agent
//!
//! Runs the background services: interval sync, nightly summary roll-up and
//! any tracking sessions started through the command layer. Stops cleanly on
//! Ctrl-C, finalizing every open session once.

use anyhow::Context;
use focusledger_agent::utils::logging::init_tracing;
use focusledger_agent::AppContext;
use focusledger_infra::config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => info!(error = %err, "no .env file loaded"),
    }

    info!(version = env!("CARGO_PKG_VERSION"), "FocusLedger starting");

    let ctx = AppContext::new(config).context("failed to initialise application context")?;
    ctx.start_background().await.context("failed to start background services")?;
    info!("FocusLedger running; press Ctrl-C to stop");

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C; shutting down");
    }

    info!("shutdown requested");
    ctx.shutdown().await.context("shutdown did not complete cleanly")?;
    Ok(())
}
