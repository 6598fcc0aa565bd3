//! Offline training: synthetic population, per-outcome candidate fitting and
//! model selection.

mod generator;
mod labels;
mod report;
mod selector;
mod split;
mod trainer;

pub use generator::{generate_features, generate_population, GeneratorConfig};
pub use labels::{label_population, LabelModelConfig, LogitWeights};
pub use report::{FailedOutcome, OutcomeSummary, TrainingReport};
pub use selector::{select, SelectorConfig};
pub use split::{stratified_kfold, stratified_split};
pub use trainer::{train_outcome, CandidateResult, TrainedOutcome, TrainerConfig};

use crate::domain::Outcome;
use crate::model::FitError;
use crate::ports::StoreError;

/// Error type for training runs.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("Training data for {outcome} is degenerate: {reason}")]
    DegenerateData { outcome: Outcome, reason: FitError },

    #[error("Fitting failed for {outcome}: {source}")]
    Fit {
        outcome: Outcome,
        #[source]
        source: FitError,
    },

    #[error("Failed to persist {artifact}: {source}")]
    Persist {
        artifact: String,
        #[source]
        source: StoreError,
    },

    #[error("Training incomplete, failed outcomes: {failed:?}")]
    Incomplete { failed: Vec<Outcome> },
}

impl TrainingError {
    /// Classify an estimator failure for one outcome.
    #[must_use]
    pub fn from_fit(outcome: Outcome, err: FitError) -> Self {
        if err.is_degenerate_data() {
            Self::DegenerateData {
                outcome,
                reason: err,
            }
        } else {
            Self::Fit {
                outcome,
                source: err,
            }
        }
    }
}
