//! API route definitions.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, SharedState};

/// Creates the API router with all routes configured
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API v1 routes
        .nest("/v1", api_v1_routes())
        // State
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes() -> Router<SharedState> {
    Router::new()
        // Exact paths
        .route("/shortest-path", post(handlers::shortest_path))
        .route("/compare", post(handlers::compare))
        // Surrogate queries
        .route("/predict", post(handlers::predict))
        .route("/evaluate", post(handlers::evaluate))
        // Model lifecycle
        .route("/train", post(handlers::train))
        .route("/compress", post(handlers::compress))
        .route("/adapt", post(handlers::adapt))
        .route("/search", post(handlers::search))
}

/// Prints all available routes for logging
pub fn print_routes() {
    tracing::info!("Available API routes:");
    tracing::info!("  GET  /health           - Health check with artifact status");
    tracing::info!("  POST /v1/shortest-path - Exact shortest path (Dijkstra / Bellman-Ford)");
    tracing::info!("  POST /v1/compare       - Compare exact algorithms on one query");
    tracing::info!("  POST /v1/predict       - Predict path length with the base model");
    tracing::info!("  POST /v1/evaluate      - Score the adapted model on one pair");
    tracing::info!("Model lifecycle routes:");
    tracing::info!("  POST /v1/train         - Train the base model on a graph");
    tracing::info!("  POST /v1/compress      - Compress the base model");
    tracing::info!("  POST /v1/adapt         - Adapt the base model to a new graph");
    tracing::info!("  POST /v1/search        - Hyperparameter search for the base model");
}
