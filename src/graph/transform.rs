//! Derived-graph generation: random augmentation and deterministic reduction.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::info;

use super::store::Graph;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Reduction fraction must lie in [0, 1], got {0}")]
    InvalidFraction(f64),
}

/// Produces augmented or reduced copies of a graph. Inputs are never mutated.
pub struct GraphTransformer {
    rng: ChaCha8Rng,
}

impl GraphTransformer {
    /// Creates a transformer; a seed makes augmentation reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng }
    }

    /// Adds up to `edge_count` previously absent edges, then perturbs every
    /// weighted edge by `U(-1, 1) * noise_level * weight`.
    ///
    /// When fewer than `edge_count` non-edges exist all of them are added.
    /// New edges carry no weight attribute and so are left unperturbed.
    pub fn augment(&mut self, graph: &Graph, edge_count: usize, noise_level: f64) -> Graph {
        let mut augmented = graph.clone();

        let candidates = graph.non_edge_indices();
        let chosen: Vec<(usize, usize)> = candidates
            .choose_multiple(&mut self.rng, edge_count)
            .copied()
            .collect();
        for &(u, v) in &chosen {
            augmented.insert_edge(u, v, None);
        }

        for (u, v, weight) in augmented.edge_indices() {
            if let Some(w) = weight {
                let noise = self.rng.gen_range(-1.0f64..=1.0) * noise_level * w;
                augmented.insert_edge(u, v, Some(w + noise));
            }
        }

        info!(
            "Augmented graph: added {} of {} requested edges, noise level {}",
            chosen.len(),
            edge_count,
            noise_level
        );
        augmented
    }

    /// Removes the first `floor(fraction * node_count)` nodes in node order,
    /// together with their incident edges.
    pub fn reduce(&self, graph: &Graph, fraction: f64) -> Result<Graph, TransformError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(TransformError::InvalidFraction(fraction));
        }

        let remove_count = (fraction * graph.node_count() as f64).floor() as usize;
        let reduced = graph.without_nodes(graph.nodes().take(remove_count));

        info!(
            "Reduced graph size by {}%. Number of nodes removed: {}",
            fraction * 100.0,
            remove_count
        );
        Ok(reduced)
    }
}

impl Default for GraphTransformer {
    fn default() -> Self {
        Self::new(None)
    }
}
