//! pathmind: exact shortest paths and learned path-length surrogates.
//!
//! This module exposes the library's public API.

pub mod api;
pub mod graph;
pub mod models;
pub mod services;

// Graph exports
pub use graph::{
    load_edgelist, load_graph, Algorithm, AlgorithmComparator, ComparisonReport, Graph,
    GraphBuilder, GraphTransformer, PathError, PathFinder, ShortestPath,
};

// Model exports
pub use models::{
    CompressionStrategy, Evaluation, ForestParams, ModelError, ModelStage, SearchSpace,
    SurrogateModel, TrainingDataSynthesizer, TrainingExample,
};

// Service exports
pub use services::{
    ArtifactStore, LifecycleConfig, LifecycleError, ModelLifecycleManager, ServiceConfig,
};
