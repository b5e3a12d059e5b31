use super::state::AppState;
use crate::capture::StatusSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CaptureControlResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectClientRequest {
    /// `null` clears the selection
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectedClientResponse {
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /capture/arm
/// Permit the state machine to start a session on next voice detection
pub async fn arm_capture(State(state): State<AppState>) -> impl IntoResponse {
    let Some(capture) = &state.capture else {
        return device_unavailable();
    };
    if !capture.status().device_ready() {
        return device_unavailable();
    }

    match capture.arm().await {
        Ok(()) => {
            info!("Capture armed");
            (
                StatusCode::OK,
                Json(CaptureControlResponse {
                    status: "armed".to_string(),
                    message: "Listening for voice".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => pipeline_gone(e),
    }
}

/// POST /capture/disarm
/// Explicit stop: force-stops any active recording session
pub async fn disarm_capture(State(state): State<AppState>) -> impl IntoResponse {
    let Some(capture) = &state.capture else {
        return device_unavailable();
    };

    match capture.disarm().await {
        Ok(()) => {
            info!("Capture disarmed");
            (
                StatusCode::OK,
                Json(CaptureControlResponse {
                    status: "idle".to_string(),
                    message: "Capture stopped".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => pipeline_gone(e),
    }
}

/// GET /capture/status
/// Current VAD state, device readiness, and in-flight upload count
pub async fn get_capture_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = match &state.capture {
        Some(capture) => capture.status().snapshot(),
        None => StatusSnapshot {
            vad_state: "idle",
            armed: false,
            device_ready: false,
            in_flight: 0,
        },
    };
    (StatusCode::OK, Json(snapshot)).into_response()
}

/// GET /clients/selected
pub async fn get_selected_client(State(state): State<AppState>) -> impl IntoResponse {
    let client_id = state.selection.get().await;
    (StatusCode::OK, Json(SelectedClientResponse { client_id })).into_response()
}

/// PUT /clients/selected
/// Change the client context; uploads already submitted keep their snapshot
pub async fn put_selected_client(
    State(state): State<AppState>,
    Json(req): Json<SelectClientRequest>,
) -> impl IntoResponse {
    info!("Selected client set to {:?}", req.client_id);
    state.selection.set(req.client_id.clone()).await;
    (
        StatusCode::OK,
        Json(SelectedClientResponse {
            client_id: req.client_id,
        }),
    )
        .into_response()
}

/// GET /notes
pub async fn list_notes(State(state): State<AppState>) -> impl IntoResponse {
    let notes = state.notes.list().await;
    (StatusCode::OK, Json(notes)).into_response()
}

/// GET /notes/client/:client_id
pub async fn list_client_notes(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> impl IntoResponse {
    let notes = state.notes.list_by_client(&client_id).await;
    (StatusCode::OK, Json(notes)).into_response()
}

/// DELETE /notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.notes.delete(&id).await {
        (StatusCode::OK, Json(DeleteResponse { deleted: 1 })).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Note {} not found", id),
            }),
        )
            .into_response()
    }
}

/// DELETE /notes/client/:client_id
/// Cascade delete when a client record is removed
pub async fn delete_client_notes(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> impl IntoResponse {
    let deleted = state.notes.delete_by_client(&client_id).await;
    info!("Deleted {} notes for client {}", deleted, client_id);
    (StatusCode::OK, Json(DeleteResponse { deleted })).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn device_unavailable() -> axum::response::Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Audio device unavailable; recording is disabled".to_string(),
        }),
    )
        .into_response()
}

fn pipeline_gone(e: anyhow::Error) -> axum::response::Response {
    error!("Capture pipeline unreachable: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Capture pipeline is not running".to_string(),
        }),
    )
        .into_response()
}
