//! Arena Bridge Server - Headless Daemon
//!
//! Serves an OpenAI-compatible API on /v1/* and relays every request to the
//! browser agent connected on /ws.
//!
//! Access via: http://127.0.0.1:5102

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod router;
mod server_utils;
#[cfg(test)]
mod test_helpers;

use arena_bridge_core::bridge::{AppState, IdleSupervisor};
use arena_bridge_core::modules::config::ConfigStore;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "🚀 Arena Bridge {} starting on {}:{}...",
        option_env!("GIT_VERSION").unwrap_or("dev"),
        cli.host,
        cli.port
    );

    let config = ConfigStore::load(&cli.data_dir);
    info!(
        "📊 {} models, {} endpoint mappings loaded from {}",
        config.models().len(),
        config.endpoints().len(),
        cli.data_dir.display()
    );

    let state = AppState::new(config.clone())?;

    let idle_supervisor =
        IdleSupervisor::new(Arc::clone(&state.registry), Arc::clone(&state.activity), config).spawn();

    let app = router::build_router(state);
    let listener = server_utils::create_listener(&cli.host, cli.port).await?;

    info!("🌐 OpenAI API at http://{}:{}/v1/", cli.host, cli.port);
    info!("🔌 Agent WebSocket at ws://{}:{}/ws", cli.host, cli.port);

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    idle_supervisor.abort();
    info!("✅ Server stopped");
    Ok(())
}
