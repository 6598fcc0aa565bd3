//! File-system model store.
//!
//! Layout of the models directory:
//! - `<outcome>_model.json`: one calibrated model per outcome
//! - `feature_order.json`: column names in model input order
//! - `manifest.json`: SHA-256 of every artifact plus the selected candidate
//! - `training_report.json`: summary of the last run (not integrity checked)
//!
//! Every file is written to a temporary sibling and renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{FeatureOrder, Outcome};
use crate::model::{CalibratedModel, CandidateKind};
use crate::ports::{ArtifactStatus, ModelStore, StoreError};
use crate::training::TrainingReport;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FEATURE_ORDER_FILE: &str = "feature_order.json";
pub const REPORT_FILE: &str = "training_report.json";

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    updated_at: DateTime<Utc>,
    /// File name -> lowercase hex SHA-256
    files: BTreeMap<String, String>,
    #[serde(default)]
    selected: BTreeMap<Outcome, CandidateKind>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            updated_at: Utc::now(),
            files: BTreeMap::new(),
            selected: BTreeMap::new(),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// JSON artifacts under one directory, guarded by a hash manifest.
#[derive(Debug)]
pub struct FsModelStore {
    dir: PathBuf,
    // Serializes manifest read-modify-write cycles.
    manifest_lock: Mutex<()>,
}

impl FsModelStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            manifest_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn artifact_path(&self, outcome: Outcome) -> PathBuf {
        self.dir.join(outcome.artifact_name())
    }

    /// Candidate kind recorded for an outcome by the last successful save.
    #[must_use]
    pub fn selected_kind(&self, outcome: Outcome) -> Option<CandidateKind> {
        self.read_manifest()
            .ok()
            .and_then(|m| m.selected.get(&outcome).copied())
    }

    fn write_atomic(&self, file: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let target = self.dir.join(file);
        let tmp = self.dir.join(format!(".{file}.tmp"));
        fs::write(&tmp, bytes).map_err(io_error(&tmp))?;
        fs::rename(&tmp, &target).map_err(io_error(&target))
    }

    fn read_manifest(&self) -> Result<Manifest, StoreError> {
        let path = self.dir.join(MANIFEST_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Manifest::default()),
            Err(e) => return Err(io_error(&path)(e)),
        };
        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                file: MANIFEST_FILE.into(),
                message: e.to_string(),
            })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StoreError::Serialization {
                file: MANIFEST_FILE.into(),
                message: format!("unsupported manifest version {}", manifest.version),
            });
        }
        Ok(manifest)
    }

    fn write_manifest(&self, manifest: &mut Manifest) -> Result<(), StoreError> {
        manifest.updated_at = Utc::now();
        let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| StoreError::Serialization {
            file: MANIFEST_FILE.into(),
            message: e.to_string(),
        })?;
        self.write_atomic(MANIFEST_FILE, &bytes)
    }

    /// Write an artifact and record its hash.
    fn save_recorded(
        &self,
        file: &str,
        bytes: &[u8],
        selection: Option<(Outcome, CandidateKind)>,
    ) -> Result<(), StoreError> {
        let _guard = self
            .manifest_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut manifest = self.read_manifest()?;
        self.write_atomic(file, bytes)?;
        manifest.files.insert(file.to_string(), sha256_hex(bytes));
        if let Some((outcome, kind)) = selection {
            manifest.selected.insert(outcome, kind);
        }
        self.write_manifest(&mut manifest)
    }

    /// Read an artifact after checking it against the manifest.
    fn load_verified(&self, file: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.dir.join(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing(path))
            }
            Err(e) => return Err(io_error(&path)(e)),
        };
        let manifest = self.read_manifest()?;
        let expected = manifest
            .files
            .get(file)
            .ok_or_else(|| StoreError::NotInManifest(file.to_string()))?;
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(StoreError::Integrity {
                file: file.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
        Ok(bytes)
    }
}

impl ModelStore for FsModelStore {
    fn save_model(&self, outcome: Outcome, model: &CalibratedModel) -> Result<(), StoreError> {
        let file = outcome.artifact_name();
        if model.outcome != outcome {
            return Err(StoreError::WrongOutcome {
                file: file.to_string(),
                expected: outcome,
                found: model.outcome,
            });
        }
        let bytes = serde_json::to_vec(model).map_err(|e| StoreError::Serialization {
            file: file.to_string(),
            message: e.to_string(),
        })?;
        self.save_recorded(&file, &bytes, Some((outcome, model.kind)))?;
        tracing::info!(
            "Saved {outcome} model ({}, {} folds) to {:?}",
            model.kind,
            model.folds.len(),
            self.artifact_path(outcome)
        );
        Ok(())
    }

    fn load_model(&self, outcome: Outcome) -> Result<CalibratedModel, StoreError> {
        let file = outcome.artifact_name();
        let bytes = self.load_verified(&file)?;
        let model: CalibratedModel =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                file: file.to_string(),
                message: e.to_string(),
            })?;
        if model.outcome != outcome {
            return Err(StoreError::WrongOutcome {
                file: file.to_string(),
                expected: outcome,
                found: model.outcome,
            });
        }
        model.check().map_err(|reason| StoreError::Malformed {
            file: file.to_string(),
            reason,
        })?;
        Ok(model)
    }

    fn save_feature_order(&self, order: &FeatureOrder) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(order).map_err(|e| StoreError::Serialization {
            file: FEATURE_ORDER_FILE.into(),
            message: e.to_string(),
        })?;
        self.save_recorded(FEATURE_ORDER_FILE, &bytes, None)
    }

    fn load_feature_order(&self) -> Result<FeatureOrder, StoreError> {
        let bytes = self.load_verified(FEATURE_ORDER_FILE)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
            file: FEATURE_ORDER_FILE.into(),
            message: e.to_string(),
        })
    }

    fn invalidate(&self, outcome: Outcome) -> Result<(), StoreError> {
        let _guard = self
            .manifest_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let file = outcome.artifact_name();
        let path = self.dir.join(&file);
        match fs::remove_file(&path) {
            Ok(()) => tracing::warn!("Removed stale {outcome} model {path:?}"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&path)(e)),
        }

        let mut manifest = self.read_manifest()?;
        let had_entry = manifest.files.remove(&file).is_some();
        let had_selection = manifest.selected.remove(&outcome).is_some();
        if had_entry || had_selection {
            self.write_manifest(&mut manifest)?;
        }
        Ok(())
    }

    fn save_report(&self, report: &TrainingReport) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(report).map_err(|e| StoreError::Serialization {
            file: REPORT_FILE.into(),
            message: e.to_string(),
        })?;
        self.write_atomic(REPORT_FILE, &bytes)
    }

    fn artifact_status(&self) -> Vec<ArtifactStatus> {
        Outcome::ALL
            .into_iter()
            .map(|outcome| {
                let path = self.artifact_path(outcome);
                let exists = path.is_file();
                ArtifactStatus {
                    outcome,
                    path,
                    exists,
                }
            })
            .collect()
    }
}
