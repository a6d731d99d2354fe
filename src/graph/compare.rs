//! Side-by-side timing of the exact algorithms on one query.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use super::sssp::{Algorithm, PathError, PathFinder, ShortestPath};
use super::store::Graph;

/// Name under which the all-pairs run is reported.
pub const FLOYD_WARSHALL: &str = "Floyd-Warshall";

/// Outcome of one algorithm on the compared query.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub algorithm: String,
    pub path: Vec<String>,
    /// Infinite when unreachable; serde_json writes that as `null`.
    pub length: f64,
    pub elapsed_ms: f64,
    /// Set when the algorithm failed (e.g. a negative cycle).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComparisonResult {
    fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-algorithm results in invocation order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonReport {
    pub results: Vec<ComparisonResult>,
}

impl ComparisonReport {
    /// Looks up a result by algorithm name.
    pub fn get(&self, algorithm: &str) -> Option<&ComparisonResult> {
        self.results.iter().find(|r| r.algorithm == algorithm)
    }

    /// Whether every successful run reported the same length.
    pub fn lengths_agree(&self, tolerance: f64) -> bool {
        let mut lengths = self.results.iter().filter(|r| r.succeeded()).map(|r| r.length);
        let Some(first) = lengths.next() else {
            return true;
        };
        lengths.all(|l| (l.is_infinite() && first.is_infinite()) || (l - first).abs() <= tolerance)
    }
}

/// Runs every [`PathFinder`] strategy on the same input.
#[derive(Debug, Default)]
pub struct AlgorithmComparator {
    finder: PathFinder,
}

impl AlgorithmComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares Dijkstra, Bellman-Ford and Floyd-Warshall on `source → target`.
    ///
    /// Only an unknown node aborts the comparison; an algorithm-level failure
    /// is recorded on that algorithm's entry.
    pub fn compare(
        &self,
        graph: &Graph,
        source: &str,
        target: &str,
    ) -> Result<ComparisonReport, PathError> {
        for node in [source, target] {
            if !graph.has_node(node) {
                return Err(PathError::NodeNotFound(node.to_string()));
            }
        }

        let mut report = ComparisonReport::default();

        for algorithm in [Algorithm::Dijkstra, Algorithm::BellmanFord] {
            let start = Instant::now();
            let outcome = self.finder.shortest_path(graph, source, target, algorithm);
            let elapsed = start.elapsed();
            report
                .results
                .push(record(algorithm.name(), outcome, elapsed.as_secs_f64() * 1000.0));
        }

        let start = Instant::now();
        let outcome = self.finder.all_pairs(graph).map(|matrix| ShortestPath {
            path: matrix.path(source, target),
            length: matrix.get(source, target),
        });
        let elapsed = start.elapsed();
        report
            .results
            .push(record(FLOYD_WARSHALL, outcome, elapsed.as_secs_f64() * 1000.0));

        Ok(report)
    }
}

fn record(
    name: &str,
    outcome: Result<ShortestPath, PathError>,
    elapsed_ms: f64,
) -> ComparisonResult {
    match outcome {
        Ok(found) => {
            info!(
                "{} algorithm: path length = {}, time taken = {:.3}ms",
                name, found.length, elapsed_ms
            );
            ComparisonResult {
                algorithm: name.to_string(),
                path: found.path,
                length: found.length,
                elapsed_ms,
                error: None,
            }
        }
        Err(e) => {
            warn!("{} algorithm failed after {:.3}ms: {}", name, elapsed_ms, e);
            ComparisonResult {
                algorithm: name.to_string(),
                path: Vec::new(),
                length: f64::INFINITY,
                elapsed_ms,
                error: Some(e.to_string()),
            }
        }
    }
}
