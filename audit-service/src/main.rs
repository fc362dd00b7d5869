use anyhow::Context;
use audit_service::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize tracing; the guard flushes the operational log on exit
    let _log_guard = init_tracing(&config)?;

    // Open the audit sink before accepting traffic
    let sink = open_sink(&config.audit).context("failed to open audit sink")?;
    let state = AppState::new(config.clone(), sink);

    // Run server
    Server::new(config).serve(state).await?;

    shutdown_tracing();

    Ok(())
}
