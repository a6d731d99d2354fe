//! Service configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CompressionStrategy, ForestParams, ModelError};

use super::storage::DEFAULT_ARTIFACT_DIR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

fn env_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

/// Configuration for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port to listen on.
    pub port: u16,

    /// Directory holding model artifacts.
    pub artifact_dir: PathBuf,

    /// Graph used when a request does not name one.
    pub default_graph: PathBuf,

    /// Whether edge-list files are read as directed graphs.
    pub directed: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            default_graph: PathBuf::from("data/graph.edgelist"),
            directed: false,
        }
    }
}

impl ServiceConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder: set artifact directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Builder: set default graph path.
    pub fn with_default_graph(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_graph = path.into();
        self
    }

    /// Builder: read graphs as directed.
    pub fn with_directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.artifact_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "artifact directory must not be empty".to_string(),
            ));
        }
        if self.default_graph.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "default graph path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SERVER_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                config.port = port;
            }
        }

        if let Ok(val) = std::env::var("ARTIFACT_DIR") {
            config.artifact_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("DEFAULT_GRAPH_PATH") {
            config.default_graph = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("GRAPH_DIRECTED") {
            config.directed = env_flag(&val);
        }

        config
    }
}

/// Configuration for the model lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Artifact name for the trained (and compressed) model.
    pub base_artifact: String,

    /// Artifact name for the most recent adapted model.
    pub adapted_artifact: String,

    /// Hyperparameters for newly trained forests.
    pub forest: ForestParams,

    /// Fraction of estimators kept by compression.
    pub retain_fraction: f64,

    /// How compression shrinks the ensemble.
    pub compression_strategy: CompressionStrategy,

    /// Largest accepted MSE increase when compressing.
    pub compression_tolerance: f64,

    /// Seed for splits and search.
    pub seed: u64,

    /// Largest graph accepted for example synthesis.
    pub max_synthesis_nodes: usize,

    /// Held-out fraction when training.
    pub test_fraction: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            base_artifact: "base".to_string(),
            adapted_artifact: "adapted".to_string(),
            forest: ForestParams::default(),
            retain_fraction: 0.5,
            compression_strategy: CompressionStrategy::Prune,
            compression_tolerance: 1.0,
            seed: 42,
            max_synthesis_nodes: 2_000,
            test_fraction: 0.2,
        }
    }
}

impl LifecycleConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set forest hyperparameters.
    pub fn with_forest(mut self, forest: ForestParams) -> Self {
        self.forest = forest;
        self
    }

    /// Builder: set retain fraction.
    pub fn with_retain_fraction(mut self, fraction: f64) -> Self {
        self.retain_fraction = fraction;
        self
    }

    /// Builder: set compression strategy.
    pub fn with_compression_strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.compression_strategy = strategy;
        self
    }

    /// Builder: set compression tolerance.
    pub fn with_compression_tolerance(mut self, tolerance: f64) -> Self {
        self.compression_tolerance = tolerance;
        self
    }

    /// Builder: set seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder: set synthesis node limit.
    pub fn with_max_synthesis_nodes(mut self, max: usize) -> Self {
        self.max_synthesis_nodes = max.max(2);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.retain_fraction > 0.0 && self.retain_fraction <= 1.0) {
            return Err(ConfigError::Model(ModelError::InvalidRetainFraction(
                self.retain_fraction,
            )));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(ConfigError::Invalid(format!(
                "test fraction must lie in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if !(self.compression_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "compression tolerance must be non-negative, got {}",
                self.compression_tolerance
            )));
        }
        if self.base_artifact == self.adapted_artifact {
            return Err(ConfigError::Invalid(
                "base and adapted artifacts must have different names".to_string(),
            ));
        }
        self.forest.validate()?;
        Ok(())
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            forest: ForestParams::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("MODEL_SEED") {
            if let Ok(seed) = val.parse::<u64>() {
                config.seed = seed;
            }
        }

        if let Ok(val) = std::env::var("MAX_SYNTHESIS_NODES") {
            if let Ok(max) = val.parse::<usize>() {
                config.max_synthesis_nodes = max.max(2);
            }
        }

        if let Ok(val) = std::env::var("COMPRESSION_RETAIN") {
            if let Ok(fraction) = val.parse::<f64>() {
                config.retain_fraction = fraction;
            }
        }

        if let Ok(val) = std::env::var("COMPRESSION_TOLERANCE") {
            if let Ok(tolerance) = val.parse::<f64>() {
                config.compression_tolerance = tolerance;
            }
        }

        if let Ok(val) = std::env::var("COMPRESSION_STRATEGY") {
            if let Ok(strategy) = val.parse::<CompressionStrategy>() {
                config.compression_strategy = strategy;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.artifact_dir, PathBuf::from("artifacts"));
        assert!(!config.directed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_service_config_builder() {
        let config = ServiceConfig::new()
            .with_port(8080)
            .with_artifact_dir("/tmp/models")
            .with_default_graph("graphs/road.edgelist")
            .with_directed(true);

        assert_eq!(config.port, 8080);
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.default_graph, PathBuf::from("graphs/road.edgelist"));
        assert!(config.directed);
    }

    #[test]
    fn test_lifecycle_config_default() {
        let config = LifecycleConfig::default();
        assert_eq!(config.base_artifact, "base");
        assert_eq!(config.adapted_artifact, "adapted");
        assert_eq!(config.compression_strategy, CompressionStrategy::Prune);
        assert_eq!(config.forest.n_estimators, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lifecycle_config_validation() {
        assert!(LifecycleConfig::new().with_retain_fraction(0.0).validate().is_err());
        assert!(LifecycleConfig::new().with_retain_fraction(1.0).validate().is_ok());
        assert!(LifecycleConfig::new()
            .with_compression_tolerance(-0.5)
            .validate()
            .is_err());
        assert!(LifecycleConfig::new()
            .with_forest(ForestParams::new().with_estimators(0))
            .validate()
            .is_err());

        let mut config = LifecycleConfig::new();
        config.adapted_artifact = "base".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_flag() {
        assert!(env_flag("true"));
        assert!(env_flag("TRUE"));
        assert!(env_flag("1"));
        assert!(!env_flag("no"));
    }
}
