//! Services for pathmind.
//!
//! This module provides:
//! - **Storage**: Atomic on-disk persistence of model artifacts
//! - **Lifecycle**: Train, compress, adapt and evaluate surrogate models
//! - **Configuration**: Service-level settings
//!
//! # Lifecycle
//!
//! ```ignore
//! use pathmind::services::{ArtifactStore, LifecycleConfig, ModelLifecycleManager};
//!
//! let manager = ModelLifecycleManager::new(
//!     LifecycleConfig::from_env(),
//!     ArtifactStore::new("artifacts"),
//! );
//! manager.train(&graph)?;
//! manager.adapt(&other_graph)?;
//! let evaluation = manager.evaluate(&other_graph, "1", "10")?;
//! ```

pub mod config;
pub mod lifecycle;
pub mod storage;

// Re-exports
pub use config::{ConfigError, LifecycleConfig, ServiceConfig};
pub use lifecycle::{
    AdaptReport, CompressReport, LifecycleError, ModelLifecycleManager, SearchReport, TrainReport,
};
pub use storage::{ArtifactStore, StorageError, DEFAULT_ARTIFACT_DIR};
