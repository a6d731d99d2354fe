//! Surrogate models that approximate shortest-path length.

pub mod baseline;
pub mod dataset;
pub mod error;
pub mod features;
pub mod forest;
pub mod metrics;
pub mod regressor;
pub mod search;
pub mod surrogate;
pub mod tree;

pub use baseline::MeanRegressor;
pub use dataset::{k_fold, to_matrix, train_test_split, TrainingDataSynthesizer, TrainingExample};
pub use error::ModelError;
pub use features::{encode_node, encode_pair, FEATURE_COUNT};
pub use forest::{ForestParams, RandomForest};
pub use metrics::{mean_squared_error, r2_score};
pub use regressor::{CompressionStrategy, Regressor, RegressorArtifact, SupportsCompression};
pub use search::{Candidate, HyperparameterSearch, SearchOutcome, SearchSpace};
pub use surrogate::{CompressionOutcome, Evaluation, ModelArtifact, ModelStage, SurrogateModel};
pub use tree::{RegressionTree, TreeParams};
