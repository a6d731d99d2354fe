//! API request handlers.
//!
//! Graph loading and every model or path computation is blocking work, so
//! each handler moves it onto the blocking pool with `spawn_blocking`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::{debug, info};

use crate::graph::{load_graph, Algorithm, AlgorithmComparator, Graph, PathFinder};
use crate::services::{LifecycleError, ModelLifecycleManager, ServiceConfig};

use super::error::{ApiError, ApiResult};
use super::types::*;

/// Candidate budget when a search request names none
const DEFAULT_SEARCH_ITERATIONS: usize = 10;

/// Application state shared across handlers
pub struct AppState {
    /// Service configuration
    pub config: ServiceConfig,

    /// Model lifecycle over the artifact store
    pub lifecycle: Arc<ModelLifecycleManager>,
}

/// Thread-safe shared state
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ServiceConfig, lifecycle: ModelLifecycleManager) -> Self {
        Self {
            config,
            lifecycle: Arc::new(lifecycle),
        }
    }

    fn graph_path(&self, graph_file: Option<&str>) -> PathBuf {
        match graph_file {
            Some(file) => PathBuf::from(file),
            None => self.config.default_graph.clone(),
        }
    }

    /// Loads a graph file off the async runtime and rejects empty ones.
    async fn load_graph(&self, graph_file: Option<&str>) -> ApiResult<Graph> {
        let path = self.graph_path(graph_file);
        let directed = self.config.directed;
        debug!("Loading graph from {:?}", path);

        let graph = tokio::task::spawn_blocking(move || load_graph(&path, directed)).await??;
        if graph.is_empty() {
            return Err(ApiError::BadRequest("Graph is empty".to_string()));
        }
        Ok(graph)
    }

    fn check_graph_size(&self, graph: &Graph) -> ApiResult<()> {
        let limit = self.lifecycle.config().max_synthesis_nodes;
        if graph.node_count() > limit {
            return Err(LifecycleError::GraphTooLarge {
                nodes: graph.node_count(),
                limit,
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// Health Check Handler
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let lifecycle_config = state.lifecycle.config();
    let store = state.lifecycle.store();

    let artifact_store = store.base_path().is_dir();
    let base_model = store.exists(&lifecycle_config.base_artifact);
    let adapted_model = store.exists(&lifecycle_config.adapted_artifact);

    let status = if base_model { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        service: "pathmind".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            artifact_store,
            base_model,
            adapted_model,
        },
    })
}

// ============================================================================
// Path Handlers
// ============================================================================

/// Predict a path length with the base model
pub async fn predict(
    State(state): State<SharedState>,
    payload: Result<Json<PairRequest>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let start = Instant::now();
    let Json(request) = payload?;
    let graph = state.load_graph(request.graph_file.as_deref()).await?;

    let lifecycle = state.lifecycle.clone();
    let (source, target) = (request.source.clone(), request.target.clone());
    let predicted_length =
        tokio::task::spawn_blocking(move || lifecycle.predict(&graph, &source, &target)).await??;

    info!(
        "Predicted length from {} to {} is {:.4}",
        request.source, request.target, predicted_length
    );

    Ok(Json(PredictResponse {
        success: true,
        source: request.source,
        target: request.target,
        predicted_length,
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Exact shortest path
pub async fn shortest_path(
    State(state): State<SharedState>,
    payload: Result<Json<ShortestPathRequest>, JsonRejection>,
) -> ApiResult<Json<ShortestPathResponse>> {
    let start = Instant::now();
    let Json(request) = payload?;
    let graph = state.load_graph(request.graph_file.as_deref()).await?;
    let algorithm = request
        .algorithm
        .unwrap_or_else(|| Algorithm::for_graph(&graph));

    let (source, target) = (request.source, request.target);
    let result = tokio::task::spawn_blocking(move || {
        PathFinder::new().shortest_path(&graph, &source, &target, algorithm)
    })
    .await??;

    debug!(
        "{} path has {} hops, length {}",
        algorithm,
        result.hop_count(),
        result.length
    );

    Ok(Json(ShortestPathResponse {
        success: true,
        algorithm: algorithm.name().to_string(),
        path: result.path,
        length: result.length,
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Run every exact algorithm on one query
pub async fn compare(
    State(state): State<SharedState>,
    payload: Result<Json<PairRequest>, JsonRejection>,
) -> ApiResult<Json<CompareResponse>> {
    let Json(request) = payload?;
    let graph = state.load_graph(request.graph_file.as_deref()).await?;
    state.check_graph_size(&graph)?;

    let (source, target) = (request.source, request.target);
    let report = tokio::task::spawn_blocking(move || {
        AlgorithmComparator::new().compare(&graph, &source, &target)
    })
    .await??;

    Ok(Json(CompareResponse {
        success: true,
        lengths_agree: report.lengths_agree(1e-9),
        results: report.results,
    }))
}

// ============================================================================
// Model Lifecycle Handlers
// ============================================================================

/// Train the base model
pub async fn train(
    State(state): State<SharedState>,
    payload: Result<Json<TrainRequest>, JsonRejection>,
) -> ApiResult<Json<TrainResponse>> {
    let start = Instant::now();
    let Json(request) = payload?;
    let graph = state.load_graph(request.graph_file.as_deref()).await?;

    let lifecycle = state.lifecycle.clone();
    let report = tokio::task::spawn_blocking(move || lifecycle.train(&graph)).await??;

    Ok(Json(TrainResponse {
        success: true,
        report,
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Compress the base model
pub async fn compress(
    State(state): State<SharedState>,
    payload: Result<Json<CompressRequest>, JsonRejection>,
) -> ApiResult<Json<CompressResponse>> {
    let Json(request) = payload?;
    let tolerance = match request.tolerance {
        Some(t) if t.is_finite() && t >= 0.0 => t,
        Some(t) => {
            return Err(ApiError::ValidationError(format!(
                "tolerance must be a non-negative number, got {}",
                t
            )))
        }
        None => state.lifecycle.config().compression_tolerance,
    };
    let graph = state.load_graph(request.graph_file.as_deref()).await?;

    let lifecycle = state.lifecycle.clone();
    let report = tokio::task::spawn_blocking(move || lifecycle.compress(&graph, tolerance)).await??;

    Ok(Json(CompressResponse {
        success: true,
        report,
    }))
}

/// Adapt the base model to a new graph
pub async fn adapt(
    State(state): State<SharedState>,
    payload: Result<Json<AdaptRequest>, JsonRejection>,
) -> ApiResult<Json<AdaptResponse>> {
    let Json(request) = payload?;
    let graph = state.load_graph(Some(request.graph_file.as_str())).await?;

    let lifecycle = state.lifecycle.clone();
    let report = tokio::task::spawn_blocking(move || lifecycle.adapt(&graph)).await??;
    info!(
        "Model adapted and saved for graph {}",
        request.graph_file
    );

    Ok(Json(AdaptResponse {
        success: true,
        status: "adapted".to_string(),
        report,
    }))
}

/// Evaluate the adapted model on one pair
pub async fn evaluate(
    State(state): State<SharedState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> ApiResult<Json<EvaluateResponse>> {
    let Json(request) = payload?;
    let graph = state.load_graph(Some(request.graph_file.as_str())).await?;

    let lifecycle = state.lifecycle.clone();
    let (source, target) = (request.source, request.target);
    let evaluation =
        tokio::task::spawn_blocking(move || lifecycle.evaluate(&graph, &source, &target)).await??;

    info!(
        "Evaluation accuracy for adapted model on graph {}: {:.4}",
        request.graph_file, evaluation.accuracy
    );

    Ok(Json(EvaluateResponse {
        success: true,
        source: evaluation.source,
        target: evaluation.target,
        accuracy: evaluation.accuracy,
        actual: evaluation.actual,
        predicted: evaluation.predicted,
        degenerate: evaluation.degenerate,
    }))
}

/// Hyperparameter search; the winner replaces the base model
pub async fn search(
    State(state): State<SharedState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let start = Instant::now();
    let Json(request) = payload?;
    let iterations = request.iterations.unwrap_or(DEFAULT_SEARCH_ITERATIONS);
    if iterations == 0 {
        return Err(ApiError::ValidationError(
            "iterations must be at least 1".to_string(),
        ));
    }
    let space = request.space.unwrap_or_default();
    space
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;
    let graph = state.load_graph(request.graph_file.as_deref()).await?;

    let lifecycle = state.lifecycle.clone();
    let report =
        tokio::task::spawn_blocking(move || lifecycle.search(&graph, space, iterations)).await??;

    Ok(Json(SearchResponse {
        success: true,
        artifact: report.artifact,
        best_params: report.best_params,
        best_cv_score: report.best_cv_score,
        test_mse: report.test_mse,
        candidates: report.candidates,
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}
