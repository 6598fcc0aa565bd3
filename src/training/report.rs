//! Summary of a training run, persisted next to the models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Outcome;
use crate::model::{CandidateKind, Scores};

/// Held-out results and the selection for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub outcome: Outcome,
    /// Positive rate over the whole population
    pub prevalence: f64,
    pub train_size: usize,
    pub test_size: usize,
    pub linear: Scores,
    pub ensemble: Scores,
    pub selected: CandidateKind,
}

/// An outcome whose training did not produce a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedOutcome {
    pub outcome: Outcome,
    pub error: String,
}

/// Record of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub samples: usize,
    pub seed: u64,
    pub outcomes: Vec<OutcomeSummary>,
    pub failed: Vec<FailedOutcome>,
}

impl TrainingReport {
    #[must_use]
    pub fn new(samples: usize, seed: u64) -> Self {
        Self {
            run_id: uuid_v4(),
            created_at: Utc::now(),
            samples,
            seed,
            outcomes: Vec::new(),
            failed: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn summary(&self, outcome: Outcome) -> Option<&OutcomeSummary> {
        self.outcomes.iter().find(|s| s.outcome == outcome)
    }
}

/// Random UUID v4 for run identifiers.
///
/// Drawn from an entropy-seeded ChaCha20 generator, independent of the
/// training seed, so two runs with the same seed still get distinct ids.
fn uuid_v4() -> String {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
