//! Ground Control server
//!
//! Loads configuration, seeds the workspace registry, starts the job
//! dispatcher and serves the HTTP API until interrupted.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use groundcontrol_backend::state::AppState;

mod cli;
mod config_helpers;
mod tracing_setup;

use cli::CliArgs;
use config_helpers::{load_config, parse_bind_address, shutdown_signal};
use tracing_setup::install_tracing_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = load_config(args.config_path.as_deref())?;
    install_tracing_from_config(&config.logging);

    tracing::info!(
        config_path = args.config_path.as_deref().unwrap_or("-"),
        workspaces_root = %config.workspaces_root.display(),
        workspaces = config.workspaces.len(),
        concurrency = config.jobs.concurrency,
        subscriber_buffer = config.jobs.subscriber_buffer,
        "configuration loaded"
    );

    let state = Arc::new(AppState::from_config(&config));
    let shutdown = state.shutdown.clone();

    let jobs = state.jobs.clone();
    let dispatcher_shutdown = shutdown.clone();
    let dispatcher = tokio::spawn(async move { jobs.work(dispatcher_shutdown).await });

    let app = groundcontrol_backend::build_router(state);

    let addr = parse_bind_address(&config.server.host, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    dispatcher.await??;
    tracing::info!("server stopped");

    Ok(())
}
