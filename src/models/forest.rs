//! Random-forest regressor.
//!
//! Trees are grown in parallel with rayon. Each tree draws from its own
//! `ChaCha8Rng` seeded with `seed + tree_index`, so a fit is reproducible
//! regardless of how the work is scheduled.

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ModelError;
use super::regressor::{
    retained_count, CompressionStrategy, Regressor, RegressorArtifact, SupportsCompression,
};
use super::tree::{RegressionTree, TreeParams};

/// Training rows kept for distillation.
const MAX_REFERENCE_ROWS: usize = 4096;

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set number of trees.
    pub fn with_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder: set maximum tree depth.
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder: set minimum samples to split.
    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    /// Builder: set minimum samples per leaf.
    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    /// Builder: set features considered per split.
    pub fn with_max_features(mut self, n: Option<usize>) -> Self {
        self.max_features = n;
        self
    }

    /// Builder: enable/disable bootstrap sampling.
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.bootstrap = enabled;
        self
    }

    /// Builder: set seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParams(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidParams(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidParams(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(ModelError::InvalidParams(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates parameters from environment variables.
    pub fn from_env() -> Self {
        let mut params = Self::default();

        if let Ok(val) = std::env::var("FOREST_ESTIMATORS") {
            if let Ok(n) = val.parse::<usize>() {
                params.n_estimators = n.max(1);
            }
        }

        if let Ok(val) = std::env::var("FOREST_MAX_DEPTH") {
            params.max_depth = val.parse::<usize>().ok().filter(|d| *d > 0);
        }

        if let Ok(val) = std::env::var("MODEL_SEED") {
            if let Ok(seed) = val.parse::<u64>() {
                params.seed = seed;
            }
        }

        params
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

/// Bagged ensemble of regression trees; predictions are the tree mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<RegressionTree>,
    n_features: usize,
    /// Seeded sample of the training rows, used as distillation inputs.
    #[serde(default)]
    reference_rows: Vec<Vec<f64>>,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
            reference_rows: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    fn check_input(x: &[Vec<f64>], y: &[f64]) -> Result<usize, ModelError> {
        if x.is_empty() {
            return Err(ModelError::InsufficientTrainingData(
                "no training rows".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(ModelError::InvalidParams(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let width = x[0].len();
        if let Some(row) = x.iter().find(|row| row.len() != width) {
            return Err(ModelError::FeatureMismatch {
                expected: width,
                actual: row.len(),
            });
        }
        Ok(width)
    }

    fn pruned(&self, k: usize) -> RandomForest {
        RandomForest {
            params: self.params.with_estimators(k),
            trees: self.trees[..k].to_vec(),
            n_features: self.n_features,
            reference_rows: self.reference_rows.clone(),
        }
    }

    /// Refits `k` trees on the reference rows labelled by the full ensemble.
    /// The rows come from real training inputs, so the student sees the same
    /// feature distribution the ensemble was fitted on.
    fn distilled(&self, k: usize) -> Result<RandomForest, ModelError> {
        if self.reference_rows.is_empty() {
            return Err(ModelError::InsufficientTrainingData(
                "forest kept no reference rows to distill on".to_string(),
            ));
        }
        let labels = self.predict(&self.reference_rows)?;
        debug!("Distilling onto {} reference rows", self.reference_rows.len());

        let mut student = RandomForest::new(self.params.with_estimators(k));
        student.fit(&self.reference_rows, &labels)?;
        Ok(student)
    }

    /// Seeded subset of `x`, in original row order.
    fn sample_reference_rows(x: &[Vec<f64>], seed: u64) -> Vec<Vec<f64>> {
        if x.len() <= MAX_REFERENCE_ROWS {
            return x.to_vec();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut picked = sample(&mut rng, x.len(), MAX_REFERENCE_ROWS).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| x[i].clone()).collect()
    }
}

impl Regressor for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        self.params.validate()?;
        let width = Self::check_input(x, y)?;
        let n = x.len();
        let params = self.params;
        let tree_params = params.tree_params();

        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let rows: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, &rows, &tree_params, &mut rng)
            })
            .collect();

        self.reference_rows = Self::sample_reference_rows(x, params.seed);
        self.trees = trees;
        self.n_features = width;

        info!(
            "Fitted random forest with {} trees on {} examples",
            self.trees.len(),
            n
        );
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if row.len() != self.n_features {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn capacity(&self) -> usize {
        if self.is_fitted() {
            self.trees.len()
        } else {
            self.params.n_estimators
        }
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(RandomForest::new(self.params))
    }

    fn clone_box(&self) -> Box<dyn Regressor> {
        Box::new(self.clone())
    }

    fn compression(&self) -> Option<&dyn SupportsCompression> {
        Some(self)
    }

    fn to_artifact(&self) -> RegressorArtifact {
        RegressorArtifact::RandomForest(self.clone())
    }
}

impl SupportsCompression for RandomForest {
    fn ensemble_size(&self) -> usize {
        self.trees.len()
    }

    fn compress(
        &self,
        retain_fraction: f64,
        strategy: CompressionStrategy,
    ) -> Result<Box<dyn Regressor>, ModelError> {
        let k = retained_count(retain_fraction, self.trees.len())?;
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }

        let compressed = match strategy {
            CompressionStrategy::Prune => self.pruned(k),
            CompressionStrategy::Distill => self.distilled(k)?,
        };
        info!(
            "Compressed forest from {} to {} trees ({})",
            self.trees.len(),
            compressed.trees.len(),
            strategy
        );
        Ok(Box::new(compressed))
    }
}
