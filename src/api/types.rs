//! API request/response types.

use serde::{Deserialize, Serialize};

use crate::graph::{Algorithm, ComparisonResult};
use crate::models::{ForestParams, SearchSpace};
use crate::services::{AdaptReport, CompressReport, TrainReport};

// ============================================================================
// Health Check
// ============================================================================

/// Health check response
#[derive(Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub components: HealthComponents,
}

/// Health status of individual components
#[derive(Serialize, Deserialize, Clone)]
pub struct HealthComponents {
    pub artifact_store: bool,
    pub base_model: bool,
    pub adapted_model: bool,
}

// ============================================================================
// Path queries
// ============================================================================

/// Request naming a node pair on an optional graph file
#[derive(Deserialize)]
pub struct PairRequest {
    pub source: String,
    pub target: String,

    /// Edge-list file; the configured default graph when absent
    pub graph_file: Option<String>,
}

/// Request for an exact shortest path
#[derive(Deserialize)]
pub struct ShortestPathRequest {
    pub source: String,
    pub target: String,
    pub graph_file: Option<String>,

    /// Algorithm to run; picked from edge weights when absent
    pub algorithm: Option<Algorithm>,
}

#[derive(Serialize)]
pub struct ShortestPathResponse {
    pub success: bool,
    pub algorithm: String,
    pub path: Vec<String>,
    /// `null` when no path exists
    pub length: f64,
    pub latency_ms: u64,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub source: String,
    pub target: String,
    pub predicted_length: f64,
    pub latency_ms: u64,
}

#[derive(Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub results: Vec<ComparisonResult>,
    pub lengths_agree: bool,
}

// ============================================================================
// Model lifecycle
// ============================================================================

#[derive(Deserialize)]
pub struct AdaptRequest {
    pub graph_file: String,
}

#[derive(Serialize)]
pub struct AdaptResponse {
    pub success: bool,
    pub status: String,
    #[serde(flatten)]
    pub report: AdaptReport,
}

#[derive(Deserialize)]
pub struct EvaluateRequest {
    pub source: String,
    pub target: String,
    pub graph_file: String,
}

#[derive(Serialize)]
pub struct EvaluateResponse {
    pub success: bool,
    pub source: String,
    pub target: String,
    pub accuracy: f64,
    /// `null` when no path exists
    pub actual: f64,
    pub predicted: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degenerate: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct TrainRequest {
    pub graph_file: Option<String>,
}

#[derive(Serialize)]
pub struct TrainResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: TrainReport,
    pub latency_ms: u64,
}

#[derive(Deserialize, Default)]
pub struct CompressRequest {
    /// Reference graph for the before/after MSE check
    pub graph_file: Option<String>,

    /// Largest accepted MSE increase; the configured tolerance when absent
    pub tolerance: Option<f64>,
}

#[derive(Serialize)]
pub struct CompressResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: CompressReport,
}

#[derive(Deserialize, Default)]
pub struct SearchRequest {
    pub graph_file: Option<String>,
    pub iterations: Option<usize>,
    pub space: Option<SearchSpace>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub artifact: String,
    pub best_params: ForestParams,
    pub best_cv_score: f64,
    pub test_mse: Option<f64>,
    pub candidates: usize,
    pub latency_ms: u64,
}
