//! HTTP handlers
//!
//! The WebSocket upgrade endpoint and a health probe.

use crate::connection::accept_connection;
use crate::server::RelayState;
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

/// Body of the health probe
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<usize>,
}

/// WebSocket upgrade handler
///
/// Frames larger than the configured limit are refused by the protocol layer
/// before they reach the relay.
pub async fn ws_handler(State(state): State<RelayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.max_message_size(state.relay_config().max_message_size)
        .on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: RelayState, socket: WebSocket) {
    if let Err(e) = accept_connection(state.registry(), socket, state.relay_config()).await {
        tracing::warn!(error = %e, "Rejected WebSocket connection");
    }
}

/// Health check endpoint
///
/// Reports the number of registered connections, or 503 once the registry has stopped.
pub async fn health_check(State(state): State<RelayState>) -> impl IntoResponse {
    match state.registry().connection_count().await {
        Ok(connections) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                connections: Some(connections),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    connections: None,
                }),
            )
        }
    }
}
