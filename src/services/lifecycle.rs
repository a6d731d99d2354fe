//! Model lifecycle: train, compress, adapt, evaluate, predict, search.
//!
//! Every stage reads its input artifact from the [`ArtifactStore`] and writes
//! its result back through it. Stages move one way; a failed stage leaves the
//! stored artifacts exactly as they were.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::graph::{Graph, PathError};
use crate::models::{
    train_test_split, CompressionStrategy, Evaluation, ForestParams, HyperparameterSearch,
    ModelError, SearchSpace, SurrogateModel, TrainingDataSynthesizer, TrainingExample,
};

use super::config::LifecycleConfig;
use super::storage::{ArtifactStore, StorageError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(
        "Compression regressed MSE from {baseline_mse:.4} to {compressed_mse:.4} (tolerance {tolerance})"
    )]
    CompressionRegressed {
        baseline_mse: f64,
        compressed_mse: f64,
        tolerance: f64,
    },

    #[error("Graph has {nodes} nodes; synthesis is limited to {limit}")]
    GraphTooLarge { nodes: usize, limit: usize },
}

impl From<PathError> for LifecycleError {
    fn from(err: PathError) -> Self {
        LifecycleError::Model(ModelError::Path(err))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub artifact: String,
    pub examples: usize,
    pub train_examples: usize,
    pub test_examples: usize,
    pub test_mse: Option<f64>,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressReport {
    pub artifact: String,
    pub compressed: bool,
    pub strategy: CompressionStrategy,
    pub original_capacity: usize,
    pub capacity: usize,
    pub baseline_mse: f64,
    pub compressed_mse: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdaptReport {
    pub artifact: String,
    pub examples: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub artifact: String,
    pub best_params: ForestParams,
    pub best_cv_score: f64,
    pub test_mse: Option<f64>,
    pub candidates: usize,
}

/// Drives surrogate models through their stages and persists each result.
#[derive(Debug)]
pub struct ModelLifecycleManager {
    config: LifecycleConfig,
    store: ArtifactStore,
    synthesizer: TrainingDataSynthesizer,
}

impl ModelLifecycleManager {
    pub fn new(config: LifecycleConfig, store: ArtifactStore) -> Self {
        Self {
            config,
            store,
            synthesizer: TrainingDataSynthesizer::new(),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn check_size(&self, graph: &Graph) -> Result<(), LifecycleError> {
        let nodes = graph.node_count();
        if nodes > self.config.max_synthesis_nodes {
            return Err(LifecycleError::GraphTooLarge {
                nodes,
                limit: self.config.max_synthesis_nodes,
            });
        }
        Ok(())
    }

    fn synthesize(&self, graph: &Graph) -> Result<Vec<TrainingExample>, LifecycleError> {
        self.check_size(graph)?;
        Ok(self.synthesizer.synthesize(graph)?)
    }

    fn load_model(&self, name: &str) -> Result<SurrogateModel, LifecycleError> {
        Ok(self.store.load(name)?.into_model())
    }

    fn save_model(&self, name: &str, model: &SurrogateModel) -> Result<(), LifecycleError> {
        self.store.save(name, &model.to_artifact(name))?;
        Ok(())
    }

    /// Trains a fresh forest on `graph` and stores it as the base artifact.
    pub fn train(&self, graph: &Graph) -> Result<TrainReport, LifecycleError> {
        let examples = self.synthesize(graph)?;
        if examples.is_empty() {
            return Err(ModelError::InsufficientTrainingData(
                "graph has no connected node pairs".to_string(),
            )
            .into());
        }
        let (train, test) = train_test_split(&examples, self.config.test_fraction, self.config.seed);

        let mut model = SurrogateModel::random_forest(self.config.forest);
        model.fit(&train)?;
        let test_mse = model.mse_on(&test)?;
        match test_mse {
            Some(mse) => info!("Model trained. Held-out MSE: {:.4}", mse),
            None => info!("Model trained without a held-out split"),
        }

        let artifact = self.config.base_artifact.clone();
        self.save_model(&artifact, &model)?;

        Ok(TrainReport {
            artifact,
            examples: examples.len(),
            train_examples: train.len(),
            test_examples: test.len(),
            test_mse,
            capacity: model.capacity(),
        })
    }

    /// Compresses the base artifact and keeps the result only if its MSE on
    /// `reference_graph` grows by at most `tolerance`. The base artifact's
    /// writer lock is held from load to save, so a concurrent train is never
    /// overwritten by a compressed copy of the older model.
    pub fn compress(
        &self,
        reference_graph: &Graph,
        tolerance: f64,
    ) -> Result<CompressReport, LifecycleError> {
        let examples = self.synthesize(reference_graph)?;
        let artifact = self.config.base_artifact.clone();
        let strategy = self.config.compression_strategy;

        self.store.update(&artifact, |stored| -> Result<_, LifecycleError> {
            let model = stored.into_model();
            let baseline_mse = model.mse_on(&examples)?.ok_or_else(|| {
                ModelError::InsufficientTrainingData(
                    "reference graph has no connected node pairs".to_string(),
                )
            })?;

            let outcome = model.compress(self.config.retain_fraction, strategy)?;
            if !outcome.compressed {
                let report = CompressReport {
                    artifact: artifact.clone(),
                    compressed: false,
                    strategy,
                    original_capacity: outcome.original_capacity,
                    capacity: outcome.model.capacity(),
                    baseline_mse,
                    compressed_mse: baseline_mse,
                };
                return Ok((report, None));
            }

            let compressed_mse = outcome.model.mse_on(&examples)?.unwrap_or(baseline_mse);
            if compressed_mse - baseline_mse > tolerance {
                warn!(
                    "Rejected compression: MSE {:.4} -> {:.4} exceeds tolerance {}",
                    baseline_mse, compressed_mse, tolerance
                );
                return Err(LifecycleError::CompressionRegressed {
                    baseline_mse,
                    compressed_mse,
                    tolerance,
                });
            }

            info!(
                "Compressed '{}' from {} to {} estimators (MSE {:.4} -> {:.4})",
                artifact,
                outcome.original_capacity,
                outcome.model.capacity(),
                baseline_mse,
                compressed_mse
            );
            let report = CompressReport {
                artifact: artifact.clone(),
                compressed: true,
                strategy,
                original_capacity: outcome.original_capacity,
                capacity: outcome.model.capacity(),
                baseline_mse,
                compressed_mse,
            };
            Ok((report, Some(outcome.model.to_artifact(&artifact))))
        })
    }

    /// Refits the base model's configuration on `graph` and stores the result
    /// as the adapted artifact.
    pub fn adapt(&self, graph: &Graph) -> Result<AdaptReport, LifecycleError> {
        let base = self.load_model(&self.config.base_artifact)?;
        self.check_size(graph)?;
        let adapted = base.adapt(graph)?;

        let artifact = self.config.adapted_artifact.clone();
        self.save_model(&artifact, &adapted)?;

        Ok(AdaptReport {
            artifact,
            examples: adapted.training_examples(),
            capacity: adapted.capacity(),
        })
    }

    /// Scores the adapted model on one pair of `graph`.
    pub fn evaluate(
        &self,
        graph: &Graph,
        source: &str,
        target: &str,
    ) -> Result<Evaluation, LifecycleError> {
        let model = self.load_model(&self.config.adapted_artifact)?;
        Ok(model.evaluate(graph, source, target)?)
    }

    /// Predicted path length between two nodes of `graph` using the base model.
    pub fn predict(&self, graph: &Graph, source: &str, target: &str) -> Result<f64, LifecycleError> {
        let model = self.load_model(&self.config.base_artifact)?;
        for node in [source, target] {
            if !graph.has_node(node) {
                return Err(PathError::NodeNotFound(node.to_string()).into());
            }
        }
        if source == target {
            return Ok(0.0);
        }
        Ok(model.predict_pair(source, target)?)
    }

    /// Searches hyperparameters on `graph` and stores the winner as the base
    /// artifact.
    pub fn search(
        &self,
        graph: &Graph,
        space: SearchSpace,
        iterations: usize,
    ) -> Result<SearchReport, LifecycleError> {
        let examples = self.synthesize(graph)?;
        let outcome = HyperparameterSearch::new(space)
            .with_iterations(iterations)
            .with_seed(self.config.seed)
            .run_on(&examples)?;

        let artifact = self.config.base_artifact.clone();
        self.save_model(&artifact, &outcome.model)?;

        Ok(SearchReport {
            artifact,
            best_params: outcome.best_params,
            best_cv_score: outcome.best_cv_score,
            test_mse: outcome.test_mse,
            candidates: outcome.candidates.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::models::ModelStage;
    use tempfile::TempDir;

    fn manager(config: LifecycleConfig) -> (ModelLifecycleManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("artifacts"));
        (ModelLifecycleManager::new(config, store), temp_dir)
    }

    fn small_config() -> LifecycleConfig {
        LifecycleConfig::new().with_forest(ForestParams::new().with_estimators(8).with_seed(3))
    }

    fn path_graph() -> Graph {
        GraphBuilder::new()
            .add_path(&["1", "2", "3", "4", "5"])
            .build()
    }

    #[test]
    fn test_train_persists_base() {
        let (manager, _temp) = manager(small_config());
        let report = manager.train(&path_graph()).unwrap();

        assert_eq!(report.artifact, "base");
        assert_eq!(report.examples, 20);
        assert_eq!(report.test_examples, 4);
        assert_eq!(report.train_examples, 16);
        assert!(report.test_mse.is_some());
        assert_eq!(report.capacity, 8);
        assert!(manager.store().exists("base"));
    }

    #[test]
    fn test_adapt_requires_base() {
        let (manager, _temp) = manager(small_config());
        assert!(matches!(
            manager.adapt(&path_graph()),
            Err(LifecycleError::Storage(StorageError::ArtifactNotFound(_)))
        ));
    }

    #[test]
    fn test_evaluate_requires_adapted() {
        let (manager, _temp) = manager(small_config());
        manager.train(&path_graph()).unwrap();

        assert!(matches!(
            manager.evaluate(&path_graph(), "1", "5"),
            Err(LifecycleError::Storage(StorageError::ArtifactNotFound(name))) if name == "adapted"
        ));
    }

    #[test]
    fn test_adapt_then_evaluate() {
        let (manager, _temp) = manager(small_config());
        manager.train(&path_graph()).unwrap();

        let other = GraphBuilder::new()
            .add_edge("a", "b", 2.0)
            .add_edge("b", "c", 2.0)
            .build();
        let report = manager.adapt(&other).unwrap();
        assert_eq!(report.artifact, "adapted");
        assert_eq!(report.examples, 6);

        let stored = manager.store().load("adapted").unwrap();
        assert_eq!(stored.stage, ModelStage::Adapted);

        let eval = manager.evaluate(&other, "a", "c").unwrap();
        assert_eq!(eval.actual, 4.0);
        assert!(eval.accuracy.is_finite());
    }

    #[test]
    fn test_adapt_edgeless_graph_fails_and_keeps_artifacts() {
        let (manager, _temp) = manager(small_config());
        manager.train(&path_graph()).unwrap();

        let mut empty = Graph::undirected();
        empty.add_node("x");
        empty.add_node("y");
        assert!(matches!(
            manager.adapt(&empty),
            Err(LifecycleError::Model(ModelError::InsufficientTrainingData(_)))
        ));
        assert!(!manager.store().exists("adapted"));
    }

    #[test]
    fn test_compress_prunes_base() {
        let (manager, _temp) = manager(small_config());
        manager.train(&path_graph()).unwrap();

        let report = manager.compress(&path_graph(), 1.0).unwrap();
        assert!(report.compressed);
        assert!(report.compressed_mse - report.baseline_mse <= 1.0);
        assert_eq!(report.original_capacity, 8);
        assert_eq!(report.capacity, 4);

        let stored = manager.store().load("base").unwrap();
        assert_eq!(stored.capacity, 4);
        assert_eq!(stored.stage, ModelStage::Compressed);
    }

    #[test]
    fn test_compress_regression_keeps_base() {
        let config = small_config().with_retain_fraction(0.1);
        let (manager, _temp) = manager(config);
        manager.train(&path_graph()).unwrap();

        let result = manager.compress(&path_graph(), -1.0);
        assert!(matches!(
            result,
            Err(LifecycleError::CompressionRegressed { .. })
        ));
        assert_eq!(manager.store().load("base").unwrap().capacity, 8);
    }

    #[test]
    fn test_predict() {
        let (manager, _temp) = manager(small_config());
        manager.train(&path_graph()).unwrap();
        let graph = path_graph();

        assert_eq!(manager.predict(&graph, "3", "3").unwrap(), 0.0);
        assert!(manager.predict(&graph, "1", "5").unwrap().is_finite());
        assert!(matches!(
            manager.predict(&graph, "1", "99"),
            Err(LifecycleError::Model(ModelError::Path(PathError::NodeNotFound(_))))
        ));
    }

    #[test]
    fn test_graph_size_limit() {
        let config = small_config().with_max_synthesis_nodes(3);
        let (manager, _temp) = manager(config);

        assert!(matches!(
            manager.train(&path_graph()),
            Err(LifecycleError::GraphTooLarge { nodes: 5, limit: 3 })
        ));
    }

    #[test]
    fn test_search_persists_base() {
        let (manager, _temp) = manager(small_config());
        let space = SearchSpace {
            n_estimators: (2, 4),
            max_depth: (2, 4),
            min_samples_split: (2, 3),
            min_samples_leaf: (1, 2),
        };

        let report = manager.search(&path_graph(), space, 3).unwrap();
        assert_eq!(report.candidates, 3);
        let stored = manager.store().load("base").unwrap();
        assert_eq!(stored.capacity, report.best_params.n_estimators);
    }
}
