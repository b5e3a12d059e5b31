use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Capture control
        .route("/capture/arm", post(handlers::arm_capture))
        .route("/capture/disarm", post(handlers::disarm_capture))
        .route("/capture/status", get(handlers::get_capture_status))
        // Selected-client context
        .route(
            "/clients/selected",
            get(handlers::get_selected_client).put(handlers::put_selected_client),
        )
        // Notes queries
        .route("/notes", get(handlers::list_notes))
        .route("/notes/:id", delete(handlers::delete_note))
        .route(
            "/notes/client/:client_id",
            get(handlers::list_client_notes).delete(handlers::delete_client_notes),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
