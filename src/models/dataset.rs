//! Training-data synthesis from exact shortest paths.
//!
//! Synthesis runs one single-source search per node, so its cost is
//! `O(V * SSSP)` and it produces up to `V * (V - 1)` examples. It is the
//! dominant expense of the whole pipeline; bound graph size before calling
//! it while serving requests.

use std::ops::Range;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::graph::{Algorithm, Graph, PathError, PathFinder};

use super::features::encode_pair;

/// A (source, target) pair labelled with its exact shortest-path length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub source: String,
    pub target: String,
    pub label: f64,
}

impl TrainingExample {
    pub fn new(source: impl Into<String>, target: impl Into<String>, label: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label,
        }
    }

    pub fn features(&self) -> Vec<f64> {
        encode_pair(&self.source, &self.target)
    }
}

/// Splits examples into a feature matrix and a label vector.
pub fn to_matrix(examples: &[TrainingExample]) -> (Vec<Vec<f64>>, Vec<f64>) {
    examples.iter().map(|e| (e.features(), e.label)).unzip()
}

/// Builds labelled node pairs from a graph.
#[derive(Debug, Default)]
pub struct TrainingDataSynthesizer {
    finder: PathFinder,
}

impl TrainingDataSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ordered pair of distinct, connected nodes with its exact
    /// distance, in node iteration order. Unreachable pairs are skipped.
    pub fn synthesize(&self, graph: &Graph) -> Result<Vec<TrainingExample>, PathError> {
        let algorithm = Algorithm::for_graph(graph);
        let mut examples = Vec::new();
        let mut skipped = 0usize;

        for source in graph.nodes() {
            let result = self.finder.single_source(graph, source, algorithm)?;
            for target in graph.nodes() {
                if source == target {
                    continue;
                }
                let distance = result.distance_to(graph, target);
                if distance.is_finite() {
                    examples.push(TrainingExample::new(source, target, distance));
                } else {
                    debug!("No path between {} and {}.", source, target);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} unreachable node pairs during synthesis", skipped);
        }
        info!(
            "Synthesized {} training examples from {} nodes using {}",
            examples.len(),
            graph.node_count(),
            algorithm
        );
        Ok(examples)
    }
}

/// Seeded shuffle-and-split. The test partition gets `ceil(n * test_fraction)`
/// examples, capped so the training partition is never empty.
pub fn train_test_split(
    examples: &[TrainingExample],
    test_fraction: f64,
    seed: u64,
) -> (Vec<TrainingExample>, Vec<TrainingExample>) {
    let n = examples.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let n_test = ((n as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize).min(n - 1);
    let test = order[..n_test].iter().map(|&i| examples[i].clone()).collect();
    let train = order[n_test..].iter().map(|&i| examples[i].clone()).collect();
    (train, test)
}

/// Contiguous fold ranges over `n` items; earlier folds absorb the remainder.
pub fn k_fold(n: usize, k: usize) -> Vec<Range<usize>> {
    let k = k.clamp(1, n.max(1));
    let base = n / k;
    let extra = n % k;

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let len = base + usize::from(i < extra);
        folds.push(start..start + len);
        start += len;
    }
    folds
}
