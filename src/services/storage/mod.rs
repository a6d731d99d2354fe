//! On-disk artifact store for surrogate models.
//!
//! Artifacts are JSON files named `<name>.json` under a base directory.
//! Writes go to `<name>.json.<uuid>.tmp` first and are moved into place with
//! `fs::rename`, so readers observe either the old or the new artifact and
//! never a partial file. Writers for the same name are serialized by a
//! per-name mutex; readers take no lock.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::ModelArtifact;

/// Default directory for persisted artifacts
pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact '{0}' not found")]
    ArtifactNotFound(String),

    #[error("Invalid artifact name: '{0}'")]
    InvalidName(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Artifact serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persists [`ModelArtifact`]s by name.
#[derive(Debug)]
pub struct ArtifactStore {
    base_path: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    /// Create a store rooted at `base_path`. The directory is created lazily
    /// on first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create the base directory if it does not exist.
    pub fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path).map_err(|source| StorageError::Io {
            path: self.base_path.clone(),
            source,
        })?;
        info!("Artifact store initialized at {:?}", self.base_path);
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Final path for an artifact name.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", name))
    }

    fn validate_name(name: &str) -> Result<(), StorageError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidName(name.to_string()))
        }
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }

    /// Write an artifact under `name`, replacing any previous one.
    pub fn save(&self, name: &str, artifact: &ModelArtifact) -> Result<PathBuf, StorageError> {
        Self::validate_name(name)?;
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        self.write_unlocked(name, artifact)
    }

    /// Load, transform and store `name` while holding its writer lock, so no
    /// other save can land between the read and the write. `apply` returns
    /// its result plus the replacement artifact, or `None` to keep the stored
    /// one.
    pub fn update<T, E, F>(&self, name: &str, apply: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(ModelArtifact) -> Result<(T, Option<ModelArtifact>), E>,
    {
        Self::validate_name(name)?;
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.load(name)?;
        let (result, replacement) = apply(current)?;
        if let Some(artifact) = replacement {
            self.write_unlocked(name, &artifact)?;
        }
        Ok(result)
    }

    fn write_unlocked(&self, name: &str, artifact: &ModelArtifact) -> Result<PathBuf, StorageError> {
        let body = serde_json::to_vec_pretty(artifact)?;

        self.init()?;
        let final_path = self.artifact_path(name);
        let temp_path = self
            .base_path
            .join(format!("{}.json.{}.tmp", name, Uuid::new_v4()));

        let written = fs::write(&temp_path, &body).and_then(|_| fs::rename(&temp_path, &final_path));
        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::Io {
                path: final_path,
                source,
            });
        }

        debug!(
            "Saved artifact '{}' ({} bytes) to {:?}",
            name,
            body.len(),
            final_path
        );
        Ok(final_path)
    }

    /// Read the artifact stored under `name`.
    pub fn load(&self, name: &str) -> Result<ModelArtifact, StorageError> {
        Self::validate_name(name)?;
        let path = self.artifact_path(name);

        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::ArtifactNotFound(name.to_string()));
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let artifact = serde_json::from_slice(&body)?;
        debug!("Loaded artifact '{}' from {:?}", name, path);
        Ok(artifact)
    }

    pub fn exists(&self, name: &str) -> bool {
        Self::validate_name(name).is_ok() && self.artifact_path(name).is_file()
    }

    /// Remove an artifact. Returns whether one was present.
    pub fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Self::validate_name(name)?;
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.artifact_path(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted artifact '{}'", name);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Names of all stored artifacts, sorted.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.base_path.clone(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_string_lossy().to_string();
                file_name.strip_suffix(".json").map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_DIR)
    }
}
