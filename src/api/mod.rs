//! HTTP Control Surface
//!
//! Thin operator API: status, pairing QR, send-message, reset, and the
//! response-table editor. Failures surface as log lines and degraded JSON
//! bodies, never as a crash of the daemon.

pub mod handlers;

use crate::bot::BotState;
use crate::config::Config;
use crate::session::SessionSync;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bot: Arc<BotState>,
    pub sync: Arc<SessionSync>,
    /// Wakes the supervisor out of its terminal logged-out wait after a reset.
    pub restart: Arc<watch::Sender<()>>,
}

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/qr", get(handlers::qr))
        .route("/send-message", post(handlers::send_message))
        .route("/reset", post(handlers::reset))
        .route("/responses", get(handlers::get_responses))
        .route("/responses", put(handlers::put_responses))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
