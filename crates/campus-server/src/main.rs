//! Campus Server — Application entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use campus_db::DbManager;
use campus_server::rate_limit::InMemoryRateLimiter;
use campus_server::state::{AppState, auth_service};
use campus_server::{ServerConfig, app, sweeper};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("campus=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting campus server...");

    let config = ServerConfig::from_env().context("loading configuration")?;
    let db = DbManager::connect(&config.db)
        .await
        .context("connecting to SurrealDB")?;

    let auth = auth_service(
        db.users(config.auth.pepper.clone()),
        db.sessions(),
        db.audit_log(),
        db.security_events(),
        &config.auth,
    )
    .context("initializing authentication")?;
    let rate_limiter = Arc::new(InMemoryRateLimiter::new(&config.rate_limit));
    let state = AppState::new(auth, config.access.clone(), rate_limiter)?;

    let sweep = tokio::spawn(sweeper::run_sweeper(
        state.clone(),
        Duration::from_secs(config.sweep_interval_secs.max(1)),
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app(state, Router::new()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    tracing::info!("Campus server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
