//! REST API for the narration producer
//!
//! Three narration endpoints plus a health check. Handlers validate the
//! request, build a `NarrationJob`, and hand it to the orchestrator.

pub mod handlers;

use crate::pipeline::Orchestrator;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))
        // API v1 routes
        .nest(
            "/api/v1",
            Router::new()
                .route("/narration", post(handlers::create_narration))
                .route("/narration/paragraph", post(handlers::create_paragraph))
                .route("/narration/episode", post(handlers::create_episode)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "fablecast-np",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port
    }))
}
