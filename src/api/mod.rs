//! API module for pathmind.
//!
//! This module provides the HTTP REST API built with Axum:
//! - `/health` - Health check endpoint
//! - `/v1/shortest-path` - Exact shortest path between two nodes
//! - `/v1/compare` - Timing comparison of the exact algorithms
//! - `/v1/predict` - Surrogate path-length prediction
//! - `/v1/evaluate` - Accuracy of the adapted model on one pair
//! - `/v1/train`, `/v1/compress`, `/v1/adapt`, `/v1/search` - Model lifecycle

pub mod error;
pub mod handlers;
pub mod routes;
pub mod types;

// Re-exports
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{AppState, SharedState};
pub use routes::{create_router, print_routes};
pub use types::*;
