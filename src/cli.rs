//! CLI Entry Point
//!
//! Argument parsing and daemon wiring: config, session store, supervisor,
//! HTTP control surface, graceful shutdown.

use crate::api::{self, AppState};
use crate::bot::{BotState, Supervisor};
use crate::client::stdio::StdioFactory;
use crate::client::ClientFactory;
use crate::config::Config;
use crate::keepalive;
use crate::session::{MemoryStore, PgStore, SessionStore, SessionSync};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(name = "wacrab", version, about = crate::DESCRIPTION)]
pub struct Cli {
    /// Path to a config file (default: ./wacrab.toml, then
    /// ~/.config/wacrab/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Override the HTTP listen port
    #[arg(long)]
    pub port: Option<u16>,
}

/// Pick the session store: Postgres when configured, otherwise in-memory.
/// A store that cannot be reached degrades to in-memory with a warning —
/// the bot keeps running, sessions just don't survive a restart.
async fn build_store(config: &Config) -> Arc<dyn SessionStore> {
    let Some(url) = config.database.connection_url() else {
        tracing::warn!("No database configured; sessions are kept in memory only");
        return Arc::new(MemoryStore::new());
    };

    match PgStore::connect(&url).await {
        Ok(store) => {
            if let Err(e) = store.ensure_schema().await {
                tracing::error!("Failed to ensure sessions table, degrading to memory: {}", e);
                return Arc::new(MemoryStore::new());
            }
            tracing::info!("Session store connected");
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("Database unreachable, degrading to memory store: {}", e);
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_factory(config: &Config) -> Result<Arc<dyn ClientFactory>> {
    match config.bot.transport.as_str() {
        "stdio" => Ok(Arc::new(StdioFactory)),
        other => anyhow::bail!("Unknown chat transport: {}", other),
    }
}

/// Run the daemon until interrupted.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    let config = Arc::new(config);
    let store = build_store(&config).await;
    let sync = Arc::new(SessionSync::new(
        store,
        config.bot.auth_dir.clone(),
        config.bot.session_id.clone(),
    ));
    let state = Arc::new(BotState::new());
    let (restart, restart_rx) = watch::channel(());
    let factory = build_factory(&config)?;

    let supervisor = Supervisor::new(
        state.clone(),
        sync.clone(),
        factory,
        config.bot.clone(),
        restart_rx,
    );
    let supervisor_task = tokio::spawn(supervisor.run());

    if let Some(url) = config.server.keepalive_url.clone() {
        keepalive::spawn(url);
    }

    let app = api::router(AppState {
        config: config.clone(),
        bot: state.clone(),
        sync: sync.clone(),
        restart: Arc::new(restart),
    });

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Control surface listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .context("HTTP server error")?;

    supervisor_task.abort();
    tracing::info!("Shut down");
    Ok(())
}

/// Wait for Ctrl-C, then log out best-effort so the phone shows a clean
/// disconnect instead of a lingering device.
async fn shutdown_signal(state: Arc<BotState>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::info!("Shutting down gracefully...");
    if let Some(client) = state.client().await
        && let Err(e) = client.logout().await
    {
        tracing::warn!("Logout on shutdown failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_transport_is_rejected() {
        let mut config = Config::default();
        config.bot.transport = "carrier-pigeon".to_string();
        assert!(build_factory(&config).is_err());
    }

    #[test]
    fn test_stdio_transport_builds() {
        let config = Config::default();
        assert!(build_factory(&config).is_ok());
    }
}
