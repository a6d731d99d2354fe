//! Exact shortest-path algorithms.
//!
//! - **Dijkstra**: binary-heap search, requires non-negative weights
//! - **Bellman-Ford**: edge relaxation, tolerates negative weights and
//!   detects negative cycles reachable from the source
//! - **Floyd-Warshall**: all-pairs distance matrix, O(V³)
//!
//! "No path" is a normal outcome: an empty path with an infinite length.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::store::Graph;

/// Shortest-path failures. Disconnection is not one of them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("Node not found in graph: {0}")]
    NodeNotFound(String),

    #[error("Negative-weight cycle reachable from {0}")]
    NegativeCycle(String),
}

/// Single-pair strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    Dijkstra,
    BellmanFord,
}

impl Algorithm {
    /// Dijkstra when every weight is non-negative, Bellman-Ford otherwise.
    pub fn for_graph(graph: &Graph) -> Self {
        if graph.has_non_negative_weights() {
            Algorithm::Dijkstra
        } else {
            Algorithm::BellmanFord
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Dijkstra => "Dijkstra",
            Algorithm::BellmanFord => "Bellman-Ford",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Entry in the priority queue for Dijkstra's algorithm.
#[derive(Clone, Copy)]
struct DijkstraEntry {
    node: usize,
    distance: f64,
}

impl Eq for DijkstraEntry {}

impl PartialEq for DijkstraEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.node == other.node
    }
}

impl Ord for DijkstraEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (smaller distance = higher priority)
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for DijkstraEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A source→target path with its total length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortestPath {
    /// Node IDs from source to target; empty when unreachable.
    pub path: Vec<String>,
    /// Sum of edge weights, `f64::INFINITY` when unreachable.
    pub length: f64,
}

impl ShortestPath {
    /// The "no path exists" outcome.
    pub fn unreachable() -> Self {
        Self {
            path: Vec::new(),
            length: f64::INFINITY,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.length.is_finite()
    }

    /// Number of edges on the path.
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Result of a single-source computation.
#[derive(Debug)]
pub struct SsspResult {
    source: usize,
    /// Distance per node index; infinite when unreachable.
    distances: Vec<f64>,
    /// Predecessor per node index for path reconstruction.
    predecessors: Vec<Option<usize>>,
    /// Nodes settled (Dijkstra) or relaxation rounds run (Bellman-Ford).
    pub work: usize,
    /// Time taken in milliseconds.
    pub time_ms: u64,
}

impl SsspResult {
    /// Distance to a target node, infinite when unreachable or unknown.
    pub fn distance_to(&self, graph: &Graph, target: &str) -> f64 {
        graph
            .index_of(target)
            .map(|t| self.distances[t])
            .unwrap_or(f64::INFINITY)
    }

    /// Reachable nodes with their distances, in node order.
    pub fn reachable<'g>(&self, graph: &'g Graph) -> Vec<(&'g str, f64)> {
        self.distances
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .map(|(i, &d)| (graph.node_at(i), d))
            .collect()
    }

    /// Reconstructs the path from the source to a target node.
    pub fn reconstruct_path(&self, graph: &Graph, target: &str) -> ShortestPath {
        let Some(t) = graph.index_of(target) else {
            return ShortestPath::unreachable();
        };
        if !self.distances[t].is_finite() {
            return ShortestPath::unreachable();
        }

        let mut nodes = vec![t];
        let mut current = t;
        while current != self.source {
            match self.predecessors[current] {
                // Guard against predecessor loops left by a negative cycle
                Some(pred) if nodes.len() <= self.distances.len() => {
                    nodes.push(pred);
                    current = pred;
                }
                _ => return ShortestPath::unreachable(),
            }
        }
        nodes.reverse();

        ShortestPath {
            path: nodes.into_iter().map(|i| graph.node_at(i).to_string()).collect(),
            length: self.distances[t],
        }
    }
}

/// All-pairs shortest-path distances.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    /// Row-major `n * n` distances.
    dist: Vec<f64>,
    /// Row-major next hop for path reconstruction.
    next: Vec<Option<usize>>,
}

impl DistanceMatrix {
    fn at(&self, i: usize, j: usize) -> f64 {
        self.dist[i * self.nodes.len() + j]
    }

    /// Number of source rows (one per node).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Length from `source` to `target`; infinite when absent or unreachable.
    pub fn get(&self, source: &str, target: &str) -> f64 {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&i), Some(&j)) => self.at(i, j),
            _ => f64::INFINITY,
        }
    }

    /// Reachable targets of a source row, in node order.
    pub fn row(&self, source: &str) -> Option<Vec<(&str, f64)>> {
        let &i = self.index.get(source)?;
        Some(
            (0..self.nodes.len())
                .filter(|&j| self.at(i, j).is_finite())
                .map(|j| (self.nodes[j].as_str(), self.at(i, j)))
                .collect(),
        )
    }

    /// Reconstructs a path from the next-hop table; empty when unreachable.
    pub fn path(&self, source: &str, target: &str) -> Vec<String> {
        let (Some(&i), Some(&j)) = (self.index.get(source), self.index.get(target)) else {
            return Vec::new();
        };
        if !self.at(i, j).is_finite() {
            return Vec::new();
        }

        let n = self.nodes.len();
        let mut path = vec![self.nodes[i].clone()];
        let mut current = i;
        while current != j {
            match self.next[current * n + j] {
                Some(hop) if path.len() <= n => {
                    path.push(self.nodes[hop].clone());
                    current = hop;
                }
                _ => return Vec::new(),
            }
        }
        path
    }
}

/// Exact shortest-path computation over a [`Graph`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFinder;

impl PathFinder {
    pub fn new() -> Self {
        Self
    }

    /// Least-cost path between two nodes with the chosen algorithm.
    pub fn shortest_path(
        &self,
        graph: &Graph,
        source: &str,
        target: &str,
        algorithm: Algorithm,
    ) -> Result<ShortestPath, PathError> {
        if !graph.has_node(target) {
            return Err(PathError::NodeNotFound(target.to_string()));
        }
        let result = self.single_source(graph, source, algorithm)?;
        Ok(result.reconstruct_path(graph, target))
    }

    /// Shortest-path length only; infinite when unreachable.
    pub fn path_length(
        &self,
        graph: &Graph,
        source: &str,
        target: &str,
        algorithm: Algorithm,
    ) -> Result<f64, PathError> {
        self.shortest_path(graph, source, target, algorithm)
            .map(|p| p.length)
    }

    /// Distances from one source to every node.
    pub fn single_source(
        &self,
        graph: &Graph,
        source: &str,
        algorithm: Algorithm,
    ) -> Result<SsspResult, PathError> {
        let s = graph
            .index_of(source)
            .ok_or_else(|| PathError::NodeNotFound(source.to_string()))?;
        match algorithm {
            Algorithm::Dijkstra => Ok(self.dijkstra(graph, s)),
            Algorithm::BellmanFord => self.bellman_ford(graph, s),
        }
    }

    fn dijkstra(&self, graph: &Graph, source: usize) -> SsspResult {
        let start = Instant::now();
        let n = graph.node_count();

        if !graph.has_non_negative_weights() {
            debug!("Dijkstra invoked on a graph with negative weights; result is unspecified");
        }

        let mut distances = vec![f64::INFINITY; n];
        let mut predecessors = vec![None; n];
        let mut visited = vec![false; n];
        let mut heap = BinaryHeap::new();
        let mut settled = 0;

        distances[source] = 0.0;
        heap.push(DijkstraEntry {
            node: source,
            distance: 0.0,
        });

        while let Some(DijkstraEntry { node, distance }) = heap.pop() {
            // Skip if we've already found a shorter path
            if visited[node] {
                continue;
            }
            visited[node] = true;
            settled += 1;

            for (neighbor, weight) in graph.out_edges(node) {
                if visited[neighbor] {
                    continue;
                }
                let candidate = distance + weight;
                if candidate < distances[neighbor] {
                    distances[neighbor] = candidate;
                    predecessors[neighbor] = Some(node);
                    heap.push(DijkstraEntry {
                        node: neighbor,
                        distance: candidate,
                    });
                }
            }
        }

        SsspResult {
            source,
            distances,
            predecessors,
            work: settled,
            time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn bellman_ford(&self, graph: &Graph, source: usize) -> Result<SsspResult, PathError> {
        let start = Instant::now();
        let n = graph.node_count();

        // Directed view of every edge, both orientations for undirected graphs
        let mut arcs: Vec<(usize, usize, f64)> = Vec::new();
        for (u, v, w) in graph.edge_indices() {
            let w = w.unwrap_or(1.0);
            arcs.push((u, v, w));
            if !graph.is_directed() && u != v {
                arcs.push((v, u, w));
            }
        }

        let mut distances = vec![f64::INFINITY; n];
        let mut predecessors = vec![None; n];
        distances[source] = 0.0;

        let mut rounds = 0;
        for _ in 1..n.max(1) {
            rounds += 1;
            let mut changed = false;
            for &(u, v, w) in &arcs {
                if distances[u].is_finite() && distances[u] + w < distances[v] {
                    distances[v] = distances[u] + w;
                    predecessors[v] = Some(u);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let relaxable = arcs
            .iter()
            .any(|&(u, v, w)| distances[u].is_finite() && distances[u] + w < distances[v]);
        if relaxable {
            return Err(PathError::NegativeCycle(graph.node_at(source).to_string()));
        }

        Ok(SsspResult {
            source,
            distances,
            predecessors,
            work: rounds,
            time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// All-pairs distances via Floyd-Warshall.
    ///
    /// Cost is cubic in the node count. Keep this out of per-request hot
    /// paths on large graphs.
    pub fn all_pairs(&self, graph: &Graph) -> Result<DistanceMatrix, PathError> {
        let start = Instant::now();
        let n = graph.node_count();
        let mut dist = vec![f64::INFINITY; n * n];
        let mut next = vec![None; n * n];

        for i in 0..n {
            dist[i * n + i] = 0.0;
            next[i * n + i] = Some(i);
        }
        for (u, v, w) in graph.edge_indices() {
            let w = w.unwrap_or(1.0);
            let mut relax = |a: usize, b: usize| {
                if w < dist[a * n + b] {
                    dist[a * n + b] = w;
                    next[a * n + b] = Some(b);
                }
            };
            relax(u, v);
            if !graph.is_directed() {
                relax(v, u);
            }
        }

        for k in 0..n {
            for i in 0..n {
                let ik = dist[i * n + k];
                if !ik.is_finite() {
                    continue;
                }
                for j in 0..n {
                    let candidate = ik + dist[k * n + j];
                    if candidate < dist[i * n + j] {
                        dist[i * n + j] = candidate;
                        next[i * n + j] = next[i * n + k];
                    }
                }
            }
        }

        if let Some(i) = (0..n).find(|&i| dist[i * n + i] < 0.0) {
            return Err(PathError::NegativeCycle(graph.node_at(i).to_string()));
        }

        debug!(
            "Floyd-Warshall over {} nodes took {}ms",
            n,
            start.elapsed().as_millis()
        );

        let nodes: Vec<String> = graph.nodes().map(str::to_string).collect();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        Ok(DistanceMatrix {
            nodes,
            index,
            dist,
            next,
        })
    }
}
