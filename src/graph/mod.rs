//! Graph storage and exact shortest-path algorithms.
//!
//! This module provides:
//! - **Store**: insertion-ordered weighted graph plus a chaining builder
//! - **SSSP**: Dijkstra, Bellman-Ford and Floyd-Warshall
//! - **Compare**: timing the algorithms against each other on one query
//! - **Transform**: random augmentation and deterministic reduction
//! - **Loader**: edge-list and GraphML parsing
//!
//! # Example
//!
//! ```ignore
//! use pathmind::graph::{Algorithm, GraphBuilder, PathFinder};
//!
//! let graph = GraphBuilder::new().add_path(&["1", "2", "3", "4"]).build();
//! let result = PathFinder::new().shortest_path(&graph, "1", "4", Algorithm::Dijkstra)?;
//! assert_eq!(result.length, 3.0);
//! ```

pub mod compare;
pub mod loader;
pub mod sssp;
pub mod store;
pub mod transform;

// Re-exports
pub use compare::{AlgorithmComparator, ComparisonReport, ComparisonResult, FLOYD_WARSHALL};
pub use loader::{
    load_edgelist, load_graph, load_graphml, parse_edgelist, parse_graphml, LoadError,
};
pub use sssp::{Algorithm, DistanceMatrix, PathError, PathFinder, ShortestPath, SsspResult};
pub use store::{Edge, Graph, GraphBuilder};
pub use transform::{GraphTransformer, TransformError};
