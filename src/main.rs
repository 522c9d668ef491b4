use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dmconsole::app::AppState;
use dmconsole::cli::Args;
use dmconsole::config::Settings;
use dmconsole::db::Session;
use dmconsole::ui::app_router;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut settings);

    let state = AppState::new(Session::new(settings.database.clone()));

    if !state.session.lock().await.connect().await {
        warn!("Database is not reachable yet, retrying on first request");
    }

    let addr = (settings.service.host.as_str(), settings.service.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}:{}", addr.0, addr.1))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let result = axum::serve(listener, app_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    state.session.lock().await.disconnect().await;

    result.context("Server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
