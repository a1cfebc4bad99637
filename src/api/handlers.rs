//! API Handlers

use super::AppState;
use crate::bot::{self, ResponseTable};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// GET / — summary for a browser poking at the root.
pub async fn root(State(state): State<AppState>) -> Response {
    let connected = state.bot.is_connected().await;
    let qr_hint = if state.bot.pairing_code().await.is_some() {
        "Pairing code available at /qr"
    } else {
        "Connected or no pairing code needed"
    };
    Json(json!({
        "status": format!("{} is running", state.config.bot.name),
        "connected": connected,
        "qr": qr_hint,
    }))
    .into_response()
}

/// GET /health — liveness probe.
pub async fn health() -> Response {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

/// GET /status — connection state and uptime.
pub async fn status(State(state): State<AppState>) -> Response {
    let connection = state.bot.connection().await;
    Json(json!({
        "connected": connection.is_open(),
        "state": connection.as_str(),
        "uptime_secs": state.bot.uptime().as_secs(),
        "memory_rss_bytes": bot::rss_bytes(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

/// GET /qr — pending pairing code, raw and rendered for a terminal.
pub async fn qr(State(state): State<AppState>) -> Response {
    let Some(code) = state.bot.pairing_code().await else {
        return Json(json!({
            "message": "No pairing code available or already connected",
        }))
        .into_response();
    };

    match qrcode::QrCode::new(code.as_bytes()) {
        Ok(qr) => {
            let rendered = qr
                .render::<qrcode::render::unicode::Dense1x2>()
                .quiet_zone(false)
                .build();
            Json(json!({ "code": code, "qr": rendered })).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to render pairing QR: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to render QR code" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub message: String,
}

/// POST /send-message — proactive send for external integrations.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    if req.number.is_empty() || req.message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Number and message are required" })),
        )
            .into_response();
    }

    let client = state.bot.client().await;
    let (Some(client), true) = (client, state.bot.is_connected().await) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "WhatsApp not connected" })),
        )
            .into_response();
    };

    let jid = if req.number.contains('@') {
        req.number.clone()
    } else {
        format!("{}@s.whatsapp.net", req.number)
    };

    match client.send_text(&jid, &req.message).await {
        Ok(()) => Json(json!({ "success": true, "message": "Message sent successfully" }))
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to send message to {}: {}", jid, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to send message" })),
            )
                .into_response()
        }
    }
}

/// POST /reset — discard all session state and force a new pairing flow.
pub async fn reset(State(state): State<AppState>) -> Response {
    match bot::reset_session(&state.bot, &state.sync, &state.restart).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Session cleared; scan the new pairing code at /qr",
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Session reset failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Reset failed: {}", e) })),
            )
                .into_response()
        }
    }
}

/// GET /responses — current canned response table.
pub async fn get_responses(State(state): State<AppState>) -> Response {
    Json(state.bot.responses().await).into_response()
}

/// PUT /responses — replace the canned response table.
pub async fn put_responses(
    State(state): State<AppState>,
    Json(table): Json<ResponseTable>,
) -> Response {
    state.bot.set_responses(table).await;
    tracing::info!("Response table updated via API");
    Json(json!({ "success": true })).into_response()
}
