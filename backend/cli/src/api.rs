use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::stream::StreamExt;
use serde_json::{json, Value};
use tessera_commands::CommandBus;
use tessera_core::CommandError;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

/// Shared application state for API handlers.
pub struct AppState {
    pub bus: CommandBus,
}

type ApiError = (StatusCode, Json<Value>);

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/state", get(get_state))
        .route("/api/layout", get(get_layout))
        .route("/api/commands", post(post_command))
        .route("/api/ws", get(ws_handler))
        .with_state(state)
}

/// WebSocket feed of every dashboard event.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut stream = state.bus.events();

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(event) => {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "event socket lagged, events dropped");
            }
        }
    }
    debug!("event socket closed");
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": if state.bus.is_shut_down() { "stopped" } else { "ok" },
        "service": "tessera",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Full state tree snapshot.
async fn get_state(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    serde_json::to_value(state.bus.store().state())
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize state");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn get_layout(State(state): State<Arc<AppState>>) -> Json<Value> {
    let layout = state.bus.store().select(|s| s.layout.layout.clone());
    Json(json!({ "layout": layout }))
}

/// Dispatch one command envelope and wait for its outcome.
async fn post_command(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let handle = state.bus.dispatch_json(&body).map_err(|e| error_response(None, &e))?;
    let correlation_id = handle.correlation_id.clone();

    match handle.wait().await {
        Ok(events) => Ok(Json(json!({ "correlationId": correlation_id, "events": events }))),
        Err(e) => Err(error_response(correlation_id, &e)),
    }
}

fn error_response(correlation_id: Option<String>, err: &CommandError) -> ApiError {
    (
        status_for(err),
        Json(json!({
            "correlationId": correlation_id,
            "reason": err.code(),
            "message": err.to_string(),
        })),
    )
}

fn status_for(err: &CommandError) -> StatusCode {
    match err {
        CommandError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
        CommandError::Unhandled(_) => StatusCode::NOT_IMPLEMENTED,
        CommandError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CommandError::InvalidState { .. } | CommandError::ReadOnly(_) => StatusCode::CONFLICT,
        CommandError::Backend(_) => StatusCode::BAD_GATEWAY,
        CommandError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        CommandError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
