//! Constant-mean baseline regressor.

use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::regressor::{Regressor, RegressorArtifact};

/// Predicts the training-label mean for every input. Has no compression
/// capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeanRegressor {
    mean: Option<f64>,
}

impl MeanRegressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for MeanRegressor {
    fn kind(&self) -> &'static str {
        "mean"
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        if y.is_empty() || x.len() != y.len() {
            return Err(ModelError::InsufficientTrainingData(
                "no training rows".to_string(),
            ));
        }
        self.mean = Some(y.iter().sum::<f64>() / y.len() as f64);
        Ok(())
    }

    fn predict_row(&self, _row: &[f64]) -> Result<f64, ModelError> {
        self.mean.ok_or(ModelError::NotFitted)
    }

    fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    fn capacity(&self) -> usize {
        1
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(MeanRegressor::new())
    }

    fn clone_box(&self) -> Box<dyn Regressor> {
        Box::new(self.clone())
    }

    fn to_artifact(&self) -> RegressorArtifact {
        RegressorArtifact::Mean(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_prediction() {
        let mut model = MeanRegressor::new();
        assert!(matches!(model.predict_row(&[]), Err(ModelError::NotFitted)));

        model.fit(&[vec![0.0], vec![1.0]], &[2.0, 4.0]).unwrap();
        assert_eq!(model.predict_row(&[99.0]).unwrap(), 3.0);
        assert!(model.compression().is_none());
    }
}
