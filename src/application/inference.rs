//! Inference service: loads the model bundle once and scores requests.
//!
//! The service is `Unloaded` or `Ready`. The transition happens once, in
//! [`InferenceService::start`]; a failed load leaves it `Unloaded` for the
//! life of the process and every prediction is refused with
//! [`InferenceError::ServiceUnavailable`].

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureOrder, FeatureVector, Outcome, RiskPrediction};
use crate::ports::{ArtifactStatus, ModelStore, RiskModel};

/// Error type for inference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load {artifact}: {reason}")]
    StartupLoad { artifact: String, reason: String },

    #[error("Service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl InferenceError {
    /// Stable machine-readable tag for error responses.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartupLoad { .. } => "startup_load",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// The three loaded models plus the feature order they were trained on.
///
/// Immutable after construction; shared by reference across requests.
pub struct ModelBundle {
    suicidal: Box<dyn RiskModel>,
    depression: Box<dyn RiskModel>,
    stress: Box<dyn RiskModel>,
    feature_order: FeatureOrder,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("feature_order", &self.feature_order)
            .finish_non_exhaustive()
    }
}

impl ModelBundle {
    /// Assemble a bundle from already-loaded models.
    ///
    /// # Errors
    /// Returns `StartupLoad` if the feature order is not the canonical one.
    pub fn new(
        suicidal: Box<dyn RiskModel>,
        depression: Box<dyn RiskModel>,
        stress: Box<dyn RiskModel>,
        feature_order: FeatureOrder,
    ) -> Result<Self, InferenceError> {
        if !feature_order.is_canonical() {
            return Err(InferenceError::StartupLoad {
                artifact: "feature order".into(),
                reason: format!(
                    "models were trained on {:?}, requests use {:?}",
                    feature_order.names(),
                    FeatureOrder::canonical().names()
                ),
            });
        }
        Ok(Self {
            suicidal,
            depression,
            stress,
            feature_order,
        })
    }

    /// Load every artifact from the store. All must succeed.
    ///
    /// # Errors
    /// Returns `StartupLoad` naming the first artifact that failed.
    pub fn load<S: ModelStore + ?Sized>(store: &S) -> Result<Self, InferenceError> {
        let feature_order = store
            .load_feature_order()
            .map_err(|e| InferenceError::StartupLoad {
                artifact: "feature order".into(),
                reason: e.to_string(),
            })?;

        let load = |outcome: Outcome| -> Result<Box<dyn RiskModel>, InferenceError> {
            let model = store
                .load_model(outcome)
                .map_err(|e| InferenceError::StartupLoad {
                    artifact: outcome.artifact_name(),
                    reason: e.to_string(),
                })?;
            tracing::info!(
                "Loaded {outcome} model ({}, {} folds)",
                model.kind,
                model.folds.len()
            );
            Ok(Box::new(model))
        };

        Self::new(
            load(Outcome::Suicidal)?,
            load(Outcome::Depression)?,
            load(Outcome::Stress)?,
            feature_order,
        )
    }

    #[must_use]
    pub fn model(&self, outcome: Outcome) -> &dyn RiskModel {
        match outcome {
            Outcome::Suicidal => self.suicidal.as_ref(),
            Outcome::Depression => self.depression.as_ref(),
            Outcome::Stress => self.stress.as_ref(),
        }
    }
}

/// Lifecycle state of the service.
#[derive(Debug)]
enum ServiceState {
    Unloaded { reason: String },
    Ready(ModelBundle),
}

/// Readiness and artifact presence, for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub artifacts: Vec<ArtifactStatus>,
}

/// Scores feature vectors against the loaded bundle.
#[derive(Debug)]
pub struct InferenceService {
    state: ServiceState,
}

impl InferenceService {
    /// Load the bundle from the store. Never fails: a load error is logged
    /// and leaves the service `Unloaded`.
    pub fn start<S: ModelStore + ?Sized>(store: &S) -> Self {
        tracing::info!("Loading model bundle...");
        match ModelBundle::load(store) {
            Ok(bundle) => {
                tracing::info!("Inference service ready");
                Self::from_bundle(bundle)
            }
            Err(e) => {
                tracing::error!("Model bundle failed to load, refusing all predictions: {e}");
                Self {
                    state: ServiceState::Unloaded {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    /// Serve an already-built bundle (tests, embedding).
    #[must_use]
    pub fn from_bundle(bundle: ModelBundle) -> Self {
        Self {
            state: ServiceState::Ready(bundle),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Three independent, clamped risk percentages.
    ///
    /// Type-valid but out-of-range scores are scored as given.
    ///
    /// # Errors
    /// Returns `ServiceUnavailable` while the service is `Unloaded`.
    pub fn predict(&self, features: &FeatureVector) -> Result<RiskPrediction, InferenceError> {
        let bundle = match &self.state {
            ServiceState::Ready(bundle) => bundle,
            ServiceState::Unloaded { reason } => {
                return Err(InferenceError::ServiceUnavailable {
                    reason: reason.clone(),
                })
            }
        };

        if let Err(problems) = features.validate() {
            tracing::debug!("Scoring out-of-range input: {}", problems.join("; "));
        }

        Ok(RiskPrediction::from_probabilities(
            bundle.model(Outcome::Suicidal).predict_proba(features),
            bundle.model(Outcome::Depression).predict_proba(features),
            bundle.model(Outcome::Stress).predict_proba(features),
        ))
    }

    #[must_use]
    pub fn model_info<S: ModelStore + ?Sized>(&self, store: &S) -> ModelInfo {
        let reason = match &self.state {
            ServiceState::Ready(_) => None,
            ServiceState::Unloaded { reason } => Some(reason.clone()),
        };
        ModelInfo {
            ready: self.is_ready(),
            reason,
            artifacts: store.artifact_status(),
        }
    }
}
