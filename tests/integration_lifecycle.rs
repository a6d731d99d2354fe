use tempfile::TempDir;

use pathmind::graph::{parse_edgelist, Graph, GraphBuilder, GraphTransformer, PathFinder};
use pathmind::models::{
    mean_squared_error, train_test_split, CompressionStrategy, ForestParams, ModelError,
    ModelStage, SurrogateModel, TrainingDataSynthesizer,
};
use pathmind::services::{
    ArtifactStore, LifecycleConfig, LifecycleError, ModelLifecycleManager, StorageError,
};
use pathmind::Algorithm;

fn manager(config: LifecycleConfig) -> (ModelLifecycleManager, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().join("artifacts"));
    (ModelLifecycleManager::new(config, store), temp)
}

/// Thirty-node unit ring with a weight-3 chord from every fifth node.
fn ring_with_chords() -> Graph {
    let n = 30;
    let mut builder = GraphBuilder::new();
    for i in 0..n {
        builder.add_edge(&i.to_string(), &((i + 1) % n).to_string(), 1.0);
        if i % 5 == 0 {
            builder.add_edge(&i.to_string(), &((i + 10) % n).to_string(), 3.0);
        }
    }
    builder.build()
}

fn config() -> LifecycleConfig {
    LifecycleConfig::new().with_forest(ForestParams::new().with_estimators(10).with_seed(4))
}

#[test]
fn test_full_pipeline_on_temp_dir() {
    let (manager, _temp) = manager(config());
    let training = parse_edgelist(
        "1 2 {'weight': 1.0}\n2 3 {'weight': 2.0}\n3 4 {'weight': 1.0}\n4 5 {'weight': 3.0}\n",
        false,
    )
    .unwrap();

    let train = manager.train(&training).unwrap();
    assert_eq!(train.examples, 20);

    let compress = manager.compress(&training, f64::MAX).unwrap();
    assert!(compress.compressed);
    assert_eq!(compress.capacity, 5);
    assert_eq!(compress.strategy, CompressionStrategy::Prune);

    let mut transformer = GraphTransformer::new(Some(42));
    let augmented = transformer.augment(&training, 2, 0.1);
    assert_eq!(augmented.edge_count(), training.edge_count() + 2);

    let adapt = manager.adapt(&augmented).unwrap();
    // the adapted model keeps the (compressed) base hyperparameters
    assert_eq!(adapt.capacity, 5);

    let evaluation = manager.evaluate(&augmented, "1", "5").unwrap();
    let exact = PathFinder::new()
        .path_length(&augmented, "1", "5", Algorithm::for_graph(&augmented))
        .unwrap();
    assert_eq!(evaluation.actual, exact);
    let expected = 1.0 - (evaluation.predicted - exact).abs() / exact;
    assert!((evaluation.accuracy - expected).abs() < 1e-12);

    let stored = manager.store().load("adapted").unwrap();
    assert_eq!(stored.stage, ModelStage::Adapted);
}

#[test]
fn test_evaluate_before_adapt() {
    let (manager, _temp) = manager(config());
    let graph = GraphBuilder::new().add_path(&["a", "b", "c"]).build();
    manager.train(&graph).unwrap();

    assert!(matches!(
        manager.evaluate(&graph, "a", "c"),
        Err(LifecycleError::Storage(StorageError::ArtifactNotFound(_)))
    ));
}

#[test]
fn test_adapt_on_reduced_graph() {
    let (manager, _temp) = manager(config());
    let graph = GraphBuilder::new()
        .add_path(&["1", "2", "3", "4", "5", "6"])
        .build();
    manager.train(&graph).unwrap();

    let reduced = GraphTransformer::new(Some(1)).reduce(&graph, 0.5).unwrap();
    assert_eq!(reduced.node_count(), 3);

    let report = manager.adapt(&reduced).unwrap();
    assert_eq!(report.examples, 6);
}

#[test]
fn test_adapt_edgeless_graph_fails_cleanly() {
    let (manager, _temp) = manager(config());
    manager
        .train(&GraphBuilder::new().add_path(&["a", "b", "c"]).build())
        .unwrap();

    let edgeless = parse_edgelist("x x\n", false).unwrap();
    assert!(matches!(
        manager.adapt(&edgeless),
        Err(LifecycleError::Model(ModelError::InsufficientTrainingData(_)))
    ));
    assert!(!manager.store().exists("adapted"));
}

#[test]
fn test_distill_strategy() {
    let config = config().with_compression_strategy(CompressionStrategy::Distill);
    let (manager, _temp) = manager(config);
    let graph = GraphBuilder::new().add_path(&["1", "2", "3", "4"]).build();
    manager.train(&graph).unwrap();

    let report = manager.compress(&graph, f64::MAX).unwrap();
    assert!(report.compressed);
    assert_eq!(report.strategy, CompressionStrategy::Distill);
    assert_eq!(report.capacity, 5);
}

#[test]
fn test_compressed_model_stays_within_held_out_tolerance() {
    let examples = TrainingDataSynthesizer::new()
        .synthesize(&ring_with_chords())
        .unwrap();
    let (train, test) = train_test_split(&examples, 0.2, 42);

    let mut base = SurrogateModel::random_forest(
        ForestParams::new().with_estimators(40).with_seed(42),
    );
    base.fit(&train).unwrap();
    let base_mse = base.mse_on(&test).unwrap().unwrap();
    let base_predictions = base.predict_examples(&test).unwrap();

    let labels: Vec<f64> = test.iter().map(|e| e.label).collect();
    let mean = labels.iter().sum::<f64>() / labels.len() as f64;
    let variance = labels.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / labels.len() as f64;
    assert!(variance > 0.0);
    let tolerance = 0.25 * variance;

    for strategy in [CompressionStrategy::Prune, CompressionStrategy::Distill] {
        let outcome = base.compress(0.5, strategy).unwrap();
        assert!(outcome.compressed);
        assert_eq!(outcome.model.capacity(), 20);

        let compressed_mse = outcome.model.mse_on(&test).unwrap().unwrap();
        let predictions = outcome.model.predict_examples(&test).unwrap();
        let drift = mean_squared_error(&base_predictions, &predictions).unwrap();

        assert!(drift < tolerance, "{strategy:?} drift {drift} vs {tolerance}");
        assert!(
            compressed_mse - base_mse < tolerance,
            "{strategy:?} MSE {base_mse} -> {compressed_mse}"
        );
    }
}

#[test]
fn test_compression_over_tolerance_leaves_base_untouched() {
    let graph = ring_with_chords();
    let config = LifecycleConfig::new()
        .with_forest(ForestParams::new().with_estimators(40).with_seed(42))
        .with_retain_fraction(0.025);
    let (manager, _temp) = manager(config);
    manager.train(&graph).unwrap();

    let before = manager.store().load("base").unwrap();
    let examples = TrainingDataSynthesizer::new().synthesize(&graph).unwrap();
    let baseline_mse = before
        .clone()
        .into_model()
        .mse_on(&examples)
        .unwrap()
        .unwrap();

    // no compressed model can lower the error by more than the baseline itself
    let result = manager.compress(&graph, -baseline_mse - 1e-9);
    assert!(matches!(
        result,
        Err(LifecycleError::CompressionRegressed { .. })
    ));

    let after = manager.store().load("base").unwrap();
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.capacity, 40);
    assert_eq!(after.stage, ModelStage::Trained);
}
