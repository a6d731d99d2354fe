//! CART regression tree used as the ensemble's weak estimator.

use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth (None = grow until leaves are pure or too small).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split an internal node.
    pub min_samples_split: usize,
    /// Minimum samples required in each leaf.
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all).
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Binary regression tree stored as a flat arena; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Grows a tree on the rows of `x` selected by `rows` (duplicates allowed,
    /// as produced by bootstrap sampling).
    pub fn fit<R: Rng + ?Sized>(
        x: &[Vec<f64>],
        y: &[f64],
        rows: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let placeholder = TreeNode::Leaf {
            value: 0.0,
            samples: 0,
        };
        let mut nodes = vec![placeholder.clone()];
        let mut pending = vec![(0usize, rows.to_vec(), 0usize)];

        while let Some((slot, rows, depth)) = pending.pop() {
            let depth_ok = params.max_depth.map_or(true, |max| depth < max);
            let size_ok = rows.len() >= params.min_samples_split.max(2)
                && rows.len() >= 2 * params.min_samples_leaf.max(1);

            let split = if depth_ok && size_ok {
                best_split(x, y, &rows, params, rng)
            } else {
                None
            };

            match split {
                Some(choice) => {
                    let left = nodes.len();
                    nodes.push(placeholder.clone());
                    let right = nodes.len();
                    nodes.push(placeholder.clone());
                    nodes[slot] = TreeNode::Split {
                        feature: choice.feature,
                        threshold: choice.threshold,
                        left,
                        right,
                    };
                    pending.push((right, choice.right, depth + 1));
                    pending.push((left, choice.left, depth + 1));
                }
                None => {
                    nodes[slot] = TreeNode::Leaf {
                        value: mean(y, &rows),
                        samples: rows.len(),
                    };
                }
            }
        }

        Self { nodes }
    }

    /// Predicts one feature row.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    current = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Split points as (feature, threshold) pairs.
    pub fn thresholds(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.nodes.iter().filter_map(|n| match n {
            TreeNode::Split {
                feature, threshold, ..
            } => Some((*feature, *threshold)),
            TreeNode::Leaf { .. } => None,
        })
    }
}

fn mean(y: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len() as f64
}

/// Variance-reduction split search over a random feature subset.
fn best_split<R: Rng + ?Sized>(
    x: &[Vec<f64>],
    y: &[f64],
    rows: &[usize],
    params: &TreeParams,
    rng: &mut R,
) -> Option<SplitChoice> {
    let n_features = x.first().map_or(0, |row| row.len());
    if n_features == 0 {
        return None;
    }
    let features: Vec<usize> = match params.max_features {
        Some(k) if k > 0 && k < n_features => sample(rng, n_features, k).into_vec(),
        _ => (0..n_features).collect(),
    };

    let n = rows.len() as f64;
    let total: f64 = rows.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = rows.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total * total / n;
    if parent_sse <= 1e-12 {
        return None;
    }

    let min_leaf = params.min_samples_leaf.max(1);
    let mut best: Option<(f64, usize, f64)> = None;
    let mut sorted = rows.to_vec();

    for &feature in &features {
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 1..sorted.len() {
            let prev = sorted[i - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            if i < min_leaf || sorted.len() - i < min_leaf {
                continue;
            }
            let lo = x[prev][feature];
            let hi = x[sorted[i]][feature];
            if lo >= hi {
                continue;
            }

            let nl = i as f64;
            let nr = n - nl;
            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / nl) + (right_sq - right_sum * right_sum / nr);

            if best.map_or(true, |(b, _, _)| sse < b) {
                best = Some((sse, feature, (lo + hi) / 2.0));
            }
        }
    }

    let (sse, feature, threshold) = best?;
    if sse >= parent_sse {
        return None;
    }
    let (left, right) = rows.iter().partition(|&&i| x[i][feature] <= threshold);
    Some(SplitChoice {
        feature,
        threshold,
        left,
        right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_fits_step_function() {
        let (x, y) = step_data();
        let rows: Vec<usize> = (0..x.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let tree = RegressionTree::fit(&x, &y, &rows, &TreeParams::default(), &mut rng);

        assert_eq!(tree.predict(&[3.0]), 1.0);
        assert_eq!(tree.predict(&[15.0]), 5.0);
        assert_eq!(tree.leaf_count(), 2);
        let (feature, threshold) = tree.thresholds().next().unwrap();
        assert_eq!(feature, 0);
        assert_eq!(threshold, 9.5);
    }

    #[test]
    fn test_max_depth_zero_is_mean() {
        let (x, y) = step_data();
        let rows: Vec<usize> = (0..x.len()).collect();
        let params = TreeParams {
            max_depth: Some(0),
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let tree = RegressionTree::fit(&x, &y, &rows, &params, &mut rng);

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[0.0]), 3.0);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let y = vec![0.0, 0.0, 0.0, 10.0];
        let rows: Vec<usize> = (0..4).collect();
        let params = TreeParams {
            min_samples_leaf: 2,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let tree = RegressionTree::fit(&x, &y, &rows, &params, &mut rng);

        // only the 2/2 split is allowed
        assert_eq!(tree.predict(&[3.0]), 5.0);
        assert_eq!(tree.predict(&[0.0]), 0.0);
    }

    #[test]
    fn test_constant_labels_make_single_leaf() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 1.0]).collect();
        let y = vec![2.0; 5];
        let rows: Vec<usize> = (0..5).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let tree = RegressionTree::fit(&x, &y, &rows, &TreeParams::default(), &mut rng);

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0, 1.0]), 2.0);
    }
}
