//! Synchronous HTTP trigger.
//!
//! One POST route. The pipeline runs on the request's own task, so a client
//! disconnect drops the task and aborts the in-flight exec stream with it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cluster::ExecStatus;
use crate::error::BridgeError;
use crate::pipeline::{Bridge, CommandRequest};

#[derive(Clone)]
pub struct HttpState {
    pub bridge: Arc<Bridge>,
}

#[derive(Serialize)]
struct CommandResponse {
    message: String,
}

/// Build the trigger router. Exposed separately from [`serve`] so tests can
/// drive it without binding a socket.
pub fn router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/create-user", post(create_user_handler))
        .with_state(HttpState { bridge })
}

/// Serve the HTTP trigger until the shutdown token fires.
pub async fn serve(
    addr: SocketAddr,
    bridge: Arc<Bridge>,
    shutdown: CancellationToken,
) -> crate::error::Result<()> {
    let app = router(bridge);

    tracing::info!(addr = %addr, "Starting HTTP trigger");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BridgeError::Config(format!("failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| BridgeError::Config(format!("HTTP trigger failed: {}", e)))
}

async fn create_user_handler(
    State(state): State<HttpState>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("failed to parse request body: {}", rejection),
            )
                .into_response();
        }
    };

    match state.bridge.run(&request).await {
        Ok(result) => match result.status {
            ExecStatus::Success => {
                let stdout = result.stdout_utf8();
                let message = if stdout.trim().is_empty() {
                    "user created".to_string()
                } else {
                    stdout.trim().to_string()
                };
                (StatusCode::OK, Json(CommandResponse { message })).into_response()
            }
            // No exit-code channel: non-empty stderr is the failure signal.
            ExecStatus::RemoteCommandError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                result.stderr_utf8().trim().to_string(),
            )
                .into_response(),
        },
        Err(e @ BridgeError::Validation(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "HTTP-triggered invocation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
