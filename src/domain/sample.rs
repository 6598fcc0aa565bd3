//! Synthetic training population.

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, N_FEATURES};
use super::outcome::Outcome;

/// One generated respondent: a feature draw plus three independent labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticSample {
    pub features: FeatureVector,
    pub suicidal: bool,
    pub depression: bool,
    pub stress: bool,
}

impl SyntheticSample {
    #[must_use]
    pub fn label(&self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Suicidal => self.suicidal,
            Outcome::Depression => self.depression,
            Outcome::Stress => self.stress,
        }
    }
}

/// A generated population, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub samples: Vec<SyntheticSample>,
}

impl Dataset {
    #[must_use]
    pub fn new(samples: Vec<SyntheticSample>) -> Self {
        Self { samples }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Feature matrix (rows in canonical column order).
    #[must_use]
    pub fn matrix(&self) -> Vec<[f64; N_FEATURES]> {
        self.samples.iter().map(|s| s.features.to_array()).collect()
    }

    /// Label vector for one outcome.
    #[must_use]
    pub fn labels(&self, outcome: Outcome) -> Vec<bool> {
        self.samples.iter().map(|s| s.label(outcome)).collect()
    }

    /// Fraction of positive labels for one outcome (0 for an empty set).
    #[must_use]
    pub fn prevalence(&self, outcome: Outcome) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let positives = self.samples.iter().filter(|s| s.label(outcome)).count();
        positives as f64 / self.samples.len() as f64
    }
}
