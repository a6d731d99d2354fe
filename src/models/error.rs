//! Model error types.

use thiserror::Error;

use crate::graph::PathError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Insufficient training data: {0}")]
    InsufficientTrainingData(String),

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Retain fraction must lie in (0, 1], got {0}")]
    InvalidRetainFraction(f64),

    #[error("Invalid hyperparameters: {0}")]
    InvalidParams(String),

    #[error("Feature mismatch: expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Path(#[from] PathError),
}

impl ModelError {
    /// Whether the caller can recover by supplying different data.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ModelError::InsufficientTrainingData(_) | ModelError::Path(PathError::NegativeCycle(_))
        )
    }
}
