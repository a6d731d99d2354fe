//! Guided hyperparameter search for the random-forest surrogate.
//!
//! The first quarter of the budget samples the space uniformly. Later
//! candidates perturb the best configuration found so far with a radius that
//! shrinks as the budget is spent, and occasionally jump to a fresh uniform
//! draw. Candidates are scored by mean R² over k-fold cross-validation on the
//! training partition; the winner is refit on the whole partition and scored
//! once on the held-out test set.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::graph::Graph;

use super::dataset::{k_fold, train_test_split, TrainingDataSynthesizer, TrainingExample};
use super::error::ModelError;
use super::forest::ForestParams;
use super::metrics::r2_score;
use super::surrogate::SurrogateModel;

/// Probability that a post-warmup candidate is drawn uniformly instead.
const EXPLORE_PROBABILITY: f64 = 0.2;

/// Smallest perturbation radius, as a fraction of each dimension's span.
const MIN_RADIUS: f64 = 0.1;

/// Inclusive bounds for each searched hyperparameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub n_estimators: (usize, usize),
    pub max_depth: (usize, usize),
    pub min_samples_split: (usize, usize),
    pub min_samples_leaf: (usize, usize),
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: (50, 500),
            max_depth: (5, 50),
            min_samples_split: (2, 10),
            min_samples_leaf: (1, 4),
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<(), ModelError> {
        let dims = [
            ("n_estimators", self.n_estimators, 1),
            ("max_depth", self.max_depth, 1),
            ("min_samples_split", self.min_samples_split, 2),
            ("min_samples_leaf", self.min_samples_leaf, 1),
        ];
        for (name, (lo, hi), floor) in dims {
            if lo > hi {
                return Err(ModelError::InvalidParams(format!(
                    "{} range is empty: ({}, {})",
                    name, lo, hi
                )));
            }
            if lo < floor {
                return Err(ModelError::InvalidParams(format!(
                    "{} lower bound must be at least {}",
                    name, floor
                )));
            }
        }
        Ok(())
    }

    fn uniform<R: Rng + ?Sized>(&self, rng: &mut R, seed: u64) -> ForestParams {
        ForestParams::new()
            .with_estimators(rng.gen_range(self.n_estimators.0..=self.n_estimators.1))
            .with_max_depth(Some(rng.gen_range(self.max_depth.0..=self.max_depth.1)))
            .with_min_samples_split(
                rng.gen_range(self.min_samples_split.0..=self.min_samples_split.1),
            )
            .with_min_samples_leaf(rng.gen_range(self.min_samples_leaf.0..=self.min_samples_leaf.1))
            .with_seed(seed)
    }

    fn perturb<R: Rng + ?Sized>(&self, rng: &mut R, best: &ForestParams, radius: f64) -> ForestParams {
        let depth = best.max_depth.unwrap_or(self.max_depth.1);
        ForestParams {
            n_estimators: nudge(rng, best.n_estimators, self.n_estimators, radius),
            max_depth: Some(nudge(rng, depth, self.max_depth, radius)),
            min_samples_split: nudge(rng, best.min_samples_split, self.min_samples_split, radius),
            min_samples_leaf: nudge(rng, best.min_samples_leaf, self.min_samples_leaf, radius),
            ..*best
        }
    }
}

fn nudge<R: Rng + ?Sized>(rng: &mut R, value: usize, (lo, hi): (usize, usize), radius: f64) -> usize {
    let span = (hi - lo) as f64 * radius * 0.5;
    let delta = rng.gen_range(-span..=span).round() as i64;
    (value as i64 + delta).clamp(lo as i64, hi as i64) as usize
}

/// One scored configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub params: ForestParams,
    pub cv_score: f64,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_params: ForestParams,
    pub best_cv_score: f64,
    /// Held-out MSE of the refit model; `None` when the test split is empty.
    pub test_mse: Option<f64>,
    pub model: SurrogateModel,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone)]
pub struct HyperparameterSearch {
    space: SearchSpace,
    iterations: usize,
    folds: usize,
    test_fraction: f64,
    split_seed: u64,
    seed: u64,
}

impl HyperparameterSearch {
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            iterations: 10,
            folds: 3,
            test_fraction: 0.2,
            split_seed: 42,
            seed: 42,
        }
    }

    /// Builder: set candidate budget.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Builder: set cross-validation folds.
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds.max(2);
        self
    }

    /// Builder: seed for candidate sampling and forest fitting.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Synthesizes examples from `graph` and runs the search on them.
    pub fn run(&self, graph: &Graph) -> Result<SearchOutcome, ModelError> {
        let examples = TrainingDataSynthesizer::new().synthesize(graph)?;
        self.run_on(&examples)
    }

    pub fn run_on(&self, examples: &[TrainingExample]) -> Result<SearchOutcome, ModelError> {
        self.space.validate()?;
        let (train, test) = train_test_split(examples, self.test_fraction, self.split_seed);
        if train.len() < 2 {
            return Err(ModelError::InsufficientTrainingData(format!(
                "search needs at least 2 training examples, got {}",
                train.len()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let warmup = (self.iterations / 4).max(1);
        let mut candidates: Vec<Candidate> = Vec::with_capacity(self.iterations);
        let mut best: Option<usize> = None;

        for i in 0..self.iterations {
            let params = match best {
                Some(b) if i >= warmup && !rng.gen_bool(EXPLORE_PROBABILITY) => {
                    let radius = (1.0 - i as f64 / self.iterations as f64).max(MIN_RADIUS);
                    self.space.perturb(&mut rng, &candidates[b].params, radius)
                }
                _ => self.space.uniform(&mut rng, self.seed),
            };

            let cv_score = self.cross_validate(&params, &train)?;
            debug!(
                "Candidate {}: {:?} scored {:.4}",
                i, params, cv_score
            );
            if best.map_or(true, |b| cv_score > candidates[b].cv_score) {
                best = Some(candidates.len());
            }
            candidates.push(Candidate { params, cv_score });
        }

        let best = best.map(|b| candidates[b].clone()).ok_or_else(|| {
            ModelError::InvalidParams("search produced no candidates".to_string())
        })?;

        let mut model = SurrogateModel::random_forest(best.params);
        model.fit(&train)?;
        let test_mse = model.mse_on(&test)?;

        info!(
            "Hyperparameter search finished: best CV R² {:.4} with {} trees",
            best.cv_score, best.params.n_estimators
        );

        Ok(SearchOutcome {
            best_params: best.params,
            best_cv_score: best.cv_score,
            test_mse,
            model,
            candidates,
        })
    }

    /// Mean validation R² across folds.
    fn cross_validate(
        &self,
        params: &ForestParams,
        train: &[TrainingExample],
    ) -> Result<f64, ModelError> {
        let mut scores = Vec::with_capacity(self.folds);

        for fold in k_fold(train.len(), self.folds) {
            if fold.is_empty() || fold.len() == train.len() {
                continue;
            }
            let fit_set: Vec<TrainingExample> = train[..fold.start]
                .iter()
                .chain(&train[fold.end..])
                .cloned()
                .collect();
            let validation = &train[fold];

            let mut model = SurrogateModel::random_forest(*params);
            model.fit(&fit_set)?;
            let predicted = model.predict_examples(validation)?;
            let actual: Vec<f64> = validation.iter().map(|e| e.label).collect();
            if let Some(score) = r2_score(&actual, &predicted) {
                scores.push(score);
            }
        }

        if scores.is_empty() {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
