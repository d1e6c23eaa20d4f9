//! Live upload progress over websocket
//!
//! On connect the client gets one frame per in-flight upload, then a frame
//! for every subsequent progress update until it disconnects.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    Json,
};
use cinevision_core::models::UploadProgress;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Snapshot of all in-flight uploads
#[utoipa::path(
    get,
    path = "/api/v0/uploads/progress",
    tag = "uploads",
    security(("service_api_key" = [])),
    responses(
        (status = 200, description = "In-flight upload progress", body = [UploadProgress])
    )
)]
pub async fn progress_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.progress.snapshot().await))
}

/// Upgrade to a websocket stream of progress frames.
pub async fn progress_ws(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_progress(socket, state))
}

async fn stream_progress(mut socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before the snapshot so updates between the two are not lost.
    let mut rx = state.progress.subscribe();

    for progress in state.progress.snapshot().await {
        if send_frame(&mut socket, &progress).await.is_err() {
            return;
        }
    }

    loop {
        match rx.recv().await {
            Ok(progress) => {
                if send_frame(&mut socket, &progress).await.is_err() {
                    return;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress subscriber lagged, frames dropped");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

async fn send_frame(socket: &mut WebSocket, progress: &UploadProgress) -> Result<(), ()> {
    let text = match serde_json::to_string(progress) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize progress frame");
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}
