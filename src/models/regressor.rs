//! Regressor abstraction shared by the surrogate model.
//!
//! A surrogate holds a `Box<dyn Regressor>`. Optional abilities such as
//! ensemble compression are exposed as capability traits that a regressor
//! may hand out through an accessor, so callers never inspect concrete types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::baseline::MeanRegressor;
use super::error::ModelError;
use super::forest::RandomForest;

/// A trainable scalar regressor over fixed-width feature rows.
pub trait Regressor: Send + Sync + fmt::Debug {
    /// Short kind name, e.g. "random_forest".
    fn kind(&self) -> &'static str;

    /// Trains from scratch, discarding any previous fit.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError>;

    /// Predicts a single feature row.
    fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError>;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    fn is_fitted(&self) -> bool;

    /// Number of estimators carried by the model.
    fn capacity(&self) -> usize;

    /// An unfitted regressor with the same hyperparameters.
    fn fresh(&self) -> Box<dyn Regressor>;

    fn clone_box(&self) -> Box<dyn Regressor>;

    /// Compression capability, if this regressor has one.
    fn compression(&self) -> Option<&dyn SupportsCompression> {
        None
    }

    /// Serializable form for persistence.
    fn to_artifact(&self) -> RegressorArtifact;
}

impl Clone for Box<dyn Regressor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// How an ensemble is shrunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionStrategy {
    /// Keep the first k fitted estimators.
    #[default]
    Prune,
    /// Refit k estimators on retained training rows labelled by the full
    /// ensemble.
    Distill,
}

impl CompressionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionStrategy::Prune => "prune",
            CompressionStrategy::Distill => "distill",
        }
    }
}

impl fmt::Display for CompressionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prune" => Ok(CompressionStrategy::Prune),
            "distill" => Ok(CompressionStrategy::Distill),
            other => Err(format!("unknown compression strategy: {}", other)),
        }
    }
}

/// Capability: the regressor can produce a smaller copy of itself.
pub trait SupportsCompression {
    /// Current number of estimators.
    fn ensemble_size(&self) -> usize;

    /// Returns a reduced copy keeping `max(1, round(retain_fraction * size))`
    /// estimators. `retain_fraction` must lie in (0, 1].
    fn compress(
        &self,
        retain_fraction: f64,
        strategy: CompressionStrategy,
    ) -> Result<Box<dyn Regressor>, ModelError>;
}

/// Validates a retain fraction and converts it into a target estimator count.
pub fn retained_count(retain_fraction: f64, size: usize) -> Result<usize, ModelError> {
    if !(retain_fraction > 0.0 && retain_fraction <= 1.0) {
        return Err(ModelError::InvalidRetainFraction(retain_fraction));
    }
    let target = (retain_fraction * size as f64).round() as usize;
    Ok(target.clamp(1, size.max(1)))
}

/// Persisted regressor, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorArtifact {
    RandomForest(RandomForest),
    Mean(MeanRegressor),
}

impl RegressorArtifact {
    pub fn into_regressor(self) -> Box<dyn Regressor> {
        match self {
            RegressorArtifact::RandomForest(forest) => Box::new(forest),
            RegressorArtifact::Mean(mean) => Box::new(mean),
        }
    }
}
