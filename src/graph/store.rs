//! In-memory weighted graph.
//!
//! Nodes are string identifiers kept in insertion order; that order is the
//! node iteration order every algorithm in the crate relies on. Edge weights
//! are optional and an absent weight counts as `1.0` wherever a length is
//! needed.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A single edge as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Raw weight; `None` means unweighted.
    pub weight: Option<f64>,
}

impl Edge {
    /// Weight used for path lengths.
    pub fn length(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

/// Weighted, directed or undirected graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    directed: bool,
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    /// Outgoing adjacency per node index. Undirected edges appear in both rows.
    adjacency: Vec<BTreeMap<usize, Option<f64>>>,
}

impl Graph {
    /// Creates an empty undirected graph.
    pub fn undirected() -> Self {
        Self::default()
    }

    /// Creates an empty directed graph.
    pub fn directed() -> Self {
        Self {
            directed: true,
            ..Default::default()
        }
    }

    /// Creates an empty graph with the given orientation.
    pub fn new(directed: bool) -> Self {
        if directed {
            Self::directed()
        } else {
            Self::undirected()
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of logical edges (undirected pairs count once).
    pub fn edge_count(&self) -> usize {
        let entries: usize = self.adjacency.iter().map(|row| row.len()).sum();
        if self.directed {
            entries
        } else {
            let loops = self
                .adjacency
                .iter()
                .enumerate()
                .filter(|(i, row)| row.contains_key(i))
                .count();
            (entries - loops) / 2 + loops
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node identifiers in iteration order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|s| s.as_str())
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Adds a node if absent and returns its index.
    pub fn add_node(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        self.adjacency.push(BTreeMap::new());
        idx
    }

    /// Adds (or overwrites) an edge, creating missing endpoints.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: Option<f64>) {
        let u = self.add_node(from);
        let v = self.add_node(to);
        self.insert_edge(u, v, weight);
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&u), Some(&v)) => self.adjacency[u].contains_key(&v),
            _ => false,
        }
    }

    /// Raw weight of an edge. Outer `None` means the edge does not exist.
    pub fn weight(&self, from: &str, to: &str) -> Option<Option<f64>> {
        let u = *self.index.get(from)?;
        let v = *self.index.get(to)?;
        self.adjacency[u].get(&v).copied()
    }

    /// Outgoing neighbours of a node with their effective lengths.
    pub fn neighbors<'a>(&'a self, id: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let row = self.index.get(id).map(|&u| &self.adjacency[u]);
        row.into_iter().flat_map(move |row| {
            row.iter()
                .map(move |(&v, w)| (self.nodes[v].as_str(), w.unwrap_or(1.0)))
        })
    }

    /// All logical edges in node order.
    pub fn edges(&self) -> Vec<Edge> {
        self.edge_indices()
            .into_iter()
            .map(|(u, v, weight)| Edge {
                from: self.nodes[u].clone(),
                to: self.nodes[v].clone(),
                weight,
            })
            .collect()
    }

    /// True when every weighted edge is non-negative.
    pub fn has_non_negative_weights(&self) -> bool {
        self.adjacency
            .iter()
            .flat_map(|row| row.values())
            .all(|w| w.map_or(true, |w| w >= 0.0))
    }

    /// Returns a copy without the given nodes and their incident edges.
    /// Remaining nodes keep their relative order.
    pub fn without_nodes<'a, I>(&self, removed: I) -> Graph
    where
        I: IntoIterator<Item = &'a str>,
    {
        let removed: std::collections::HashSet<&str> = removed.into_iter().collect();
        let mut reduced = Graph::new(self.directed);
        for node in self.nodes() {
            if !removed.contains(node) {
                reduced.add_node(node);
            }
        }
        for edge in self.edges() {
            if !removed.contains(edge.from.as_str()) && !removed.contains(edge.to.as_str()) {
                reduced.add_edge(&edge.from, &edge.to, edge.weight);
            }
        }
        reduced
    }

    // Index-level access used by the algorithms.

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_at(&self, idx: usize) -> &str {
        &self.nodes[idx]
    }

    pub(crate) fn out_edges(&self, u: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.adjacency[u].iter().map(|(&v, w)| (v, w.unwrap_or(1.0)))
    }

    /// Logical edges as index triples; undirected edges once with `u <= v`.
    pub(crate) fn edge_indices(&self) -> Vec<(usize, usize, Option<f64>)> {
        let mut edges = Vec::new();
        for (u, row) in self.adjacency.iter().enumerate() {
            for (&v, &w) in row {
                if self.directed || u <= v {
                    edges.push((u, v, w));
                }
            }
        }
        edges
    }

    /// Node pairs without an edge, excluding self-pairs, in node order.
    pub(crate) fn non_edge_indices(&self) -> Vec<(usize, usize)> {
        let n = self.nodes.len();
        let mut pairs = Vec::new();
        for u in 0..n {
            let start = if self.directed { 0 } else { u + 1 };
            for v in start..n {
                if u != v && !self.adjacency[u].contains_key(&v) {
                    pairs.push((u, v));
                }
            }
        }
        pairs
    }

    pub(crate) fn insert_edge(&mut self, u: usize, v: usize, weight: Option<f64>) {
        self.adjacency[u].insert(v, weight);
        if !self.directed {
            self.adjacency[v].insert(u, weight);
        }
    }
}

/// Graph equality compares orientation, node set and edge set, ignoring order.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        if self.directed != other.directed
            || self.node_count() != other.node_count()
            || self.edge_count() != other.edge_count()
        {
            return false;
        }
        if !self.nodes().all(|n| other.has_node(n)) {
            return false;
        }
        self.edges()
            .iter()
            .all(|e| other.weight(&e.from, &e.to) == Some(e.weight))
    }
}

/// Builder for creating graph structures.
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    /// Creates a builder for an undirected graph.
    pub fn new() -> Self {
        Self {
            graph: Graph::undirected(),
        }
    }

    /// Creates a builder for a directed graph.
    pub fn directed() -> Self {
        Self {
            graph: Graph::directed(),
        }
    }

    /// Adds a node to the graph.
    pub fn add_node(&mut self, id: &str) -> &mut Self {
        self.graph.add_node(id);
        self
    }

    /// Adds a weighted edge.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64) -> &mut Self {
        self.graph.add_edge(from, to, Some(weight));
        self
    }

    /// Adds an edge without a weight attribute.
    pub fn add_unweighted_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.graph.add_edge(from, to, None);
        self
    }

    /// Adds a chain of unit-weight edges through the given nodes.
    pub fn add_path(&mut self, ids: &[&str]) -> &mut Self {
        for pair in ids.windows(2) {
            self.add_edge(pair[0], pair[1], 1.0);
        }
        self
    }

    /// Builds the graph.
    pub fn build(&mut self) -> Graph {
        std::mem::take(&mut self.graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undirected_edges_counted_once() {
        let graph = GraphBuilder::new().add_path(&["1", "2", "3"]).build();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_edge("2", "1"));
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_directed_edges() {
        let graph = GraphBuilder::directed().add_edge("a", "b", 2.0).build();

        assert!(graph.has_edge("a", "b"));
        assert!(!graph.has_edge("b", "a"));
        assert_eq!(graph.weight("a", "b"), Some(Some(2.0)));
        assert_eq!(graph.weight("b", "a"), None);
    }

    #[test]
    fn test_self_loop_count() {
        let mut graph = Graph::undirected();
        graph.add_edge("x", "x", None);
        graph.add_edge("x", "y", None);

        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_unweighted_neighbors_have_unit_length() {
        let graph = GraphBuilder::new().add_unweighted_edge("a", "b").build();
        let neighbors: Vec<_> = graph.neighbors("a").collect();

        assert_eq!(neighbors, vec![("b", 1.0)]);
    }

    #[test]
    fn test_nodes_keep_insertion_order() {
        let graph = GraphBuilder::new()
            .add_node("z")
            .add_node("a")
            .add_node("m")
            .build();

        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_without_nodes() {
        let graph = GraphBuilder::new().add_path(&["1", "2", "3", "4"]).build();
        let reduced = graph.without_nodes(["2"]);

        assert_eq!(reduced.nodes().collect::<Vec<_>>(), vec!["1", "3", "4"]);
        assert_eq!(reduced.edge_count(), 1);
        assert!(reduced.has_edge("3", "4"));
        // original untouched
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_non_edges() {
        let graph = GraphBuilder::new().add_path(&["1", "2", "3"]).build();
        assert_eq!(graph.non_edge_indices(), vec![(0, 2)]);

        let directed = GraphBuilder::directed().add_edge("1", "2", 1.0).build();
        assert_eq!(directed.non_edge_indices(), vec![(1, 0)]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = GraphBuilder::new().add_edge("1", "2", 1.0).add_edge("2", "3", 2.0).build();
        let b = GraphBuilder::new().add_edge("3", "2", 2.0).add_edge("2", "1", 1.0).build();
        let c = GraphBuilder::new().add_edge("1", "2", 1.0).add_edge("2", "3", 5.0).build();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_non_negative_weights() {
        let positive = GraphBuilder::new().add_edge("1", "2", 3.0).build();
        let negative = GraphBuilder::directed().add_edge("1", "2", -1.0).build();

        assert!(positive.has_non_negative_weights());
        assert!(!negative.has_non_negative_weights());
    }
}
