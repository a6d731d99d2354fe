//! Learned surrogate for shortest-path length.
//!
//! A [`SurrogateModel`] wraps a boxed [`Regressor`] and tracks where it is in
//! its lifecycle. Every transition (`compress`, `adapt`) produces a new owned
//! model; the source is never mutated.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::graph::{Algorithm, Graph, PathFinder};

use super::baseline::MeanRegressor;
use super::dataset::{to_matrix, TrainingDataSynthesizer, TrainingExample};
use super::error::ModelError;
use super::features::encode_pair;
use super::forest::{ForestParams, RandomForest};
use super::metrics::mean_squared_error;
use super::regressor::{retained_count, CompressionStrategy, Regressor, RegressorArtifact};
use super::search::{HyperparameterSearch, SearchOutcome, SearchSpace};

/// Lifecycle stage of a surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStage {
    Untrained,
    Trained,
    Compressed,
    Adapted,
}

impl ModelStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStage::Untrained => "untrained",
            ModelStage::Trained => "trained",
            ModelStage::Compressed => "compressed",
            ModelStage::Adapted => "adapted",
        }
    }
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`SurrogateModel::compress`].
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub model: SurrogateModel,
    /// False when the regressor has no compression capability.
    pub compressed: bool,
    pub original_capacity: usize,
}

/// Surrogate prediction checked against the exact distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub source: String,
    pub target: String,
    /// Exact length; infinite when no path exists.
    pub actual: f64,
    pub predicted: f64,
    /// `1 - |predicted - actual| / |actual|`. Heuristic score, not clamped,
    /// and negative for predictions off by more than the actual length.
    pub accuracy: f64,
    /// Why the score could not be computed, if it couldn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degenerate: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SurrogateModel {
    regressor: Box<dyn Regressor>,
    stage: ModelStage,
    training_examples: usize,
}

impl SurrogateModel {
    pub fn new(regressor: Box<dyn Regressor>) -> Self {
        let stage = if regressor.is_fitted() {
            ModelStage::Trained
        } else {
            ModelStage::Untrained
        };
        Self {
            regressor,
            stage,
            training_examples: 0,
        }
    }

    pub fn random_forest(params: ForestParams) -> Self {
        Self::new(Box::new(RandomForest::new(params)))
    }

    pub fn baseline() -> Self {
        Self::new(Box::new(MeanRegressor::new()))
    }

    pub fn stage(&self) -> ModelStage {
        self.stage
    }

    pub fn kind(&self) -> &'static str {
        self.regressor.kind()
    }

    /// Ensemble size.
    pub fn capacity(&self) -> usize {
        self.regressor.capacity()
    }

    pub fn is_fitted(&self) -> bool {
        self.regressor.is_fitted()
    }

    pub fn training_examples(&self) -> usize {
        self.training_examples
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    /// Trains from scratch on the given examples.
    pub fn fit(&mut self, examples: &[TrainingExample]) -> Result<(), ModelError> {
        if examples.is_empty() {
            return Err(ModelError::InsufficientTrainingData(
                "no training examples".to_string(),
            ));
        }
        let (x, y) = to_matrix(examples);
        self.regressor.fit(&x, &y)?;
        self.stage = ModelStage::Trained;
        self.training_examples = examples.len();
        Ok(())
    }

    /// One prediction per (source, target) pair, in order.
    pub fn predict<S: AsRef<str>>(&self, pairs: &[(S, S)]) -> Result<Vec<f64>, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        let rows: Vec<Vec<f64>> = pairs
            .iter()
            .map(|(s, t)| encode_pair(s.as_ref(), t.as_ref()))
            .collect();
        self.regressor.predict(&rows)
    }

    pub fn predict_pair(&self, source: &str, target: &str) -> Result<f64, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        self.regressor.predict_row(&encode_pair(source, target))
    }

    pub fn predict_examples(&self, examples: &[TrainingExample]) -> Result<Vec<f64>, ModelError> {
        let pairs: Vec<(&str, &str)> = examples
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        self.predict(&pairs)
    }

    /// Mean squared error against example labels; `None` for no examples.
    pub fn mse_on(&self, examples: &[TrainingExample]) -> Result<Option<f64>, ModelError> {
        if examples.is_empty() {
            return Ok(None);
        }
        let predicted = self.predict_examples(examples)?;
        let actual: Vec<f64> = examples.iter().map(|e| e.label).collect();
        Ok(mean_squared_error(&actual, &predicted))
    }

    /// Shrinks the ensemble through the regressor's compression capability.
    /// Regressors without one come back unchanged with `compressed = false`.
    pub fn compress(
        &self,
        retain_fraction: f64,
        strategy: CompressionStrategy,
    ) -> Result<CompressionOutcome, ModelError> {
        let original_capacity = self.capacity();
        retained_count(retain_fraction, original_capacity)?;

        let Some(capability) = self.regressor.compression() else {
            warn!(
                "Model compression not supported for {} regressors",
                self.kind()
            );
            return Ok(CompressionOutcome {
                model: self.clone(),
                compressed: false,
                original_capacity,
            });
        };

        let regressor = capability.compress(retain_fraction, strategy)?;
        Ok(CompressionOutcome {
            model: SurrogateModel {
                regressor,
                stage: ModelStage::Compressed,
                training_examples: self.training_examples,
            },
            compressed: true,
            original_capacity,
        })
    }

    /// Refits a fresh regressor with the same hyperparameters on examples
    /// synthesized from `graph`.
    pub fn adapt(&self, graph: &Graph) -> Result<SurrogateModel, ModelError> {
        let examples = TrainingDataSynthesizer::new().synthesize(graph)?;
        if examples.is_empty() {
            return Err(ModelError::InsufficientTrainingData(format!(
                "graph with {} nodes and {} edges has no connected node pairs",
                graph.node_count(),
                graph.edge_count()
            )));
        }

        let mut adapted = SurrogateModel::new(self.regressor.fresh());
        adapted.fit(&examples)?;
        adapted.stage = ModelStage::Adapted;
        info!(
            "Adapted {} model to new graph using {} examples",
            adapted.kind(),
            examples.len()
        );
        Ok(adapted)
    }

    /// Compares the prediction for one pair against its exact distance.
    pub fn evaluate(
        &self,
        graph: &Graph,
        source: &str,
        target: &str,
    ) -> Result<Evaluation, ModelError> {
        let exact = PathFinder::new().shortest_path(
            graph,
            source,
            target,
            Algorithm::for_graph(graph),
        )?;
        let actual = exact.length;
        let predicted = self.predict_pair(source, target)?;

        let degenerate = if !actual.is_finite() {
            Some(format!("no path between {} and {}", source, target))
        } else if actual == 0.0 {
            Some("actual path length is zero".to_string())
        } else {
            None
        };

        let accuracy = match degenerate {
            Some(ref reason) => {
                debug!("Degenerate evaluation: {}", reason);
                0.0
            }
            None => 1.0 - (predicted - actual).abs() / actual.abs(),
        };

        Ok(Evaluation {
            source: source.to_string(),
            target: target.to_string(),
            actual,
            predicted,
            accuracy,
            degenerate,
        })
    }

    /// Guided hyperparameter search for a random forest on `graph`.
    pub fn search_hyperparameters(
        graph: &Graph,
        space: SearchSpace,
        iterations: usize,
        seed: u64,
    ) -> Result<SearchOutcome, ModelError> {
        HyperparameterSearch::new(space)
            .with_iterations(iterations)
            .with_seed(seed)
            .run(graph)
    }

    pub fn to_artifact(&self, name: &str) -> ModelArtifact {
        ModelArtifact {
            name: name.to_string(),
            stage: self.stage,
            created_at: Utc::now(),
            capacity: self.capacity(),
            training_examples: self.training_examples,
            regressor: self.regressor.to_artifact(),
        }
    }
}

/// Persisted envelope around a regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub stage: ModelStage,
    pub created_at: DateTime<Utc>,
    pub capacity: usize,
    pub training_examples: usize,
    pub regressor: RegressorArtifact,
}

impl ModelArtifact {
    pub fn into_model(self) -> SurrogateModel {
        SurrogateModel {
            regressor: self.regressor.into_regressor(),
            stage: self.stage,
            training_examples: self.training_examples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, PathError};

    fn path_graph() -> Graph {
        GraphBuilder::new().add_path(&["1", "2", "3", "4"]).build()
    }

    fn trained_forest(graph: &Graph) -> SurrogateModel {
        let examples = TrainingDataSynthesizer::new().synthesize(graph).unwrap();
        let mut model =
            SurrogateModel::random_forest(ForestParams::new().with_estimators(10).with_seed(1));
        model.fit(&examples).unwrap();
        model
    }

    #[test]
    fn test_fit_requires_examples() {
        let mut model = SurrogateModel::baseline();
        assert!(matches!(
            model.fit(&[]),
            Err(ModelError::InsufficientTrainingData(_))
        ));
        assert_eq!(model.stage(), ModelStage::Untrained);
    }

    #[test]
    fn test_predict_unfitted() {
        let model = SurrogateModel::random_forest(ForestParams::default());
        assert!(matches!(
            model.predict(&[("1", "2")]),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_predict_one_per_pair_in_order() {
        let model = trained_forest(&path_graph());
        let pairs = [("1", "4"), ("1", "2"), ("9", "10")];
        let predictions = model.predict(&pairs).unwrap();

        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[1], model.predict_pair("1", "2").unwrap());
        assert!(predictions.iter().all(|p| p.is_finite()));
        assert_eq!(model.stage(), ModelStage::Trained);
        assert_eq!(model.training_examples(), 12);
    }

    #[test]
    fn test_compress_prunes_forest() {
        let model = trained_forest(&path_graph());
        let outcome = model.compress(0.5, CompressionStrategy::Prune).unwrap();

        assert!(outcome.compressed);
        assert_eq!(outcome.original_capacity, 10);
        assert_eq!(outcome.model.capacity(), 5);
        assert_eq!(outcome.model.stage(), ModelStage::Compressed);
        assert_eq!(model.capacity(), 10);
    }

    #[test]
    fn test_compress_unsupported_is_noop() {
        let mut model = SurrogateModel::baseline();
        model.fit(&[TrainingExample::new("1", "2", 3.0)]).unwrap();

        let outcome = model.compress(0.5, CompressionStrategy::Prune).unwrap();
        assert!(!outcome.compressed);
        assert_eq!(outcome.model.stage(), ModelStage::Trained);
        assert_eq!(outcome.model.predict_pair("5", "6").unwrap(), 3.0);
    }

    #[test]
    fn test_compress_rejects_bad_fraction() {
        let model = trained_forest(&path_graph());
        assert!(matches!(
            model.compress(0.0, CompressionStrategy::Prune),
            Err(ModelError::InvalidRetainFraction(_))
        ));
    }

    #[test]
    fn test_adapt_returns_new_model() {
        let model = trained_forest(&path_graph());
        let before = model.predict_pair("1", "4").unwrap();

        let other = GraphBuilder::new()
            .add_edge("a", "b", 10.0)
            .add_edge("b", "c", 10.0)
            .build();
        let adapted = model.adapt(&other).unwrap();

        assert_eq!(adapted.stage(), ModelStage::Adapted);
        assert_eq!(adapted.training_examples(), 6);
        assert_eq!(adapted.capacity(), model.capacity());
        assert_eq!(model.predict_pair("1", "4").unwrap(), before);
        assert_eq!(model.stage(), ModelStage::Trained);
    }

    #[test]
    fn test_adapt_edgeless_graph_fails() {
        let model = trained_forest(&path_graph());
        let mut empty = Graph::undirected();
        empty.add_node("x");
        empty.add_node("y");

        assert!(matches!(
            model.adapt(&empty),
            Err(ModelError::InsufficientTrainingData(_))
        ));
    }

    #[test]
    fn test_evaluate_scores() {
        let graph = path_graph();
        let model = trained_forest(&graph);

        let eval = model.evaluate(&graph, "1", "4").unwrap();
        assert_eq!(eval.actual, 3.0);
        assert!(eval.degenerate.is_none());
        let expected = 1.0 - (eval.predicted - 3.0).abs() / 3.0;
        assert!((eval.accuracy - expected).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_degenerate_cases() {
        let mut graph = path_graph();
        graph.add_node("island");
        let model = trained_forest(&graph);

        let unreachable = model.evaluate(&graph, "1", "island").unwrap();
        assert_eq!(unreachable.accuracy, 0.0);
        assert!(unreachable.actual.is_infinite());
        assert!(unreachable.degenerate.is_some());

        let same = model.evaluate(&graph, "2", "2").unwrap();
        assert_eq!(same.accuracy, 0.0);
        assert!(same.degenerate.is_some());

        assert!(matches!(
            model.evaluate(&graph, "1", "ghost"),
            Err(ModelError::Path(PathError::NodeNotFound(_)))
        ));
    }

    #[test]
    fn test_artifact_restores_model() {
        let model = trained_forest(&path_graph());
        let artifact = model.to_artifact("base");
        let json = serde_json::to_string(&artifact).unwrap();
        let restored: ModelArtifact = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.name, "base");
        assert_eq!(restored.capacity, 10);
        let restored = restored.into_model();
        assert_eq!(restored.stage(), ModelStage::Trained);
        let diff = restored.predict_pair("2", "3").unwrap() - model.predict_pair("2", "3").unwrap();
        assert!(diff.abs() < 1e-9);
    }
}
