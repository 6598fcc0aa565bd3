//! Model store port: durable persistence of the selected models.
//!
//! Artifacts are replaced wholesale by a training run and never patched.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureOrder, Outcome};
use crate::model::CalibratedModel;
use crate::training::TrainingReport;

/// Error type for model store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact missing: {0:?}")]
    Missing(PathBuf),

    #[error("Serialization error in {file}: {message}")]
    Serialization { file: String, message: String },

    #[error("Integrity check failed for {file}: expected sha256 {expected}, found {actual}")]
    Integrity {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Artifact {file} is malformed: {reason}")]
    Malformed { file: String, reason: String },

    #[error("Artifact {0} is not recorded in the manifest")]
    NotInManifest(String),

    #[error("Artifact {file} holds a model for {found}, expected {expected}")]
    WrongOutcome {
        file: String,
        expected: Outcome,
        found: Outcome,
    },
}

/// Presence of one outcome's artifact on durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStatus {
    pub outcome: Outcome,
    pub path: PathBuf,
    pub exists: bool,
}

/// Trait for model artifact persistence.
pub trait ModelStore: Send + Sync {
    /// Persist one outcome's selected model, replacing any previous artifact.
    ///
    /// # Errors
    /// Any write failure; the caller must treat it as fatal for that outcome.
    fn save_model(&self, outcome: Outcome, model: &CalibratedModel) -> Result<(), StoreError>;

    /// Load one outcome's model.
    ///
    /// # Errors
    /// Returns error if the artifact is missing, corrupt or for another outcome.
    fn load_model(&self, outcome: Outcome) -> Result<CalibratedModel, StoreError>;

    /// Persist the canonical feature order.
    ///
    /// # Errors
    /// Returns error if the write fails.
    fn save_feature_order(&self, order: &FeatureOrder) -> Result<(), StoreError>;

    /// Load the persisted feature order.
    ///
    /// # Errors
    /// Returns error if the descriptor is missing or corrupt.
    fn load_feature_order(&self) -> Result<FeatureOrder, StoreError>;

    /// Remove an outcome's artifact so a stale model can never be loaded.
    ///
    /// # Errors
    /// Returns error if an existing artifact cannot be removed.
    fn invalidate(&self, outcome: Outcome) -> Result<(), StoreError>;

    /// Persist the summary of a training run.
    ///
    /// # Errors
    /// Returns error if the write fails.
    fn save_report(&self, report: &TrainingReport) -> Result<(), StoreError>;

    /// Per-outcome artifact location and presence.
    fn artifact_status(&self) -> Vec<ArtifactStatus>;
}
