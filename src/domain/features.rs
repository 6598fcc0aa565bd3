//! Survey-derived feature vector.
//!
//! The five columns come from three screening instruments (PHQ-9, GAD-7, K10),
//! the PHQ-9 self-harm item and the ASQ suicide-risk screen. Their order is a
//! contract between training and inference and is persisted with the models.

use serde::{Deserialize, Serialize};

/// Number of model input columns.
pub const N_FEATURES: usize = 5;

/// Canonical column order: phq_total, gad_total, k10_total, phq_item9, asq_any_yes.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "phq_total",
    "gad_total",
    "k10_total",
    "phq_item9",
    "asq_any_yes",
];

/// Column index of the binary ASQ flag (passed through unscaled).
pub const BINARY_COLUMN: usize = 4;

/// Valid integer range for each scored column (inclusive).
pub const PHQ_TOTAL_RANGE: (i64, i64) = (0, 27);
pub const GAD_TOTAL_RANGE: (i64, i64) = (0, 21);
pub const K10_TOTAL_RANGE: (i64, i64) = (10, 50);
pub const PHQ_ITEM9_RANGE: (i64, i64) = (0, 3);

/// One respondent's survey totals.
///
/// This is also the wire shape of a prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// PHQ-9 total score (0-27)
    pub phq_total: i64,

    /// GAD-7 total score (0-21)
    pub gad_total: i64,

    /// Kessler K10 total score (10-50)
    pub k10_total: i64,

    /// PHQ-9 item 9, thoughts of self-harm (0-3)
    pub phq_item9: i64,

    /// Any "yes" answer on the ASQ screen
    pub asq_any_yes: bool,
}

impl FeatureVector {
    /// Convert to a model input row in canonical column order.
    #[must_use]
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [
            self.phq_total as f64,
            self.gad_total as f64,
            self.k10_total as f64,
            self.phq_item9 as f64,
            if self.asq_any_yes { 1.0 } else { 0.0 },
        ]
    }

    /// Check each score against its instrument range.
    ///
    /// Scoring never rejects out-of-range input; callers use this to warn.
    ///
    /// # Errors
    /// Returns one message per out-of-range field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let checks = [
            ("phq_total", self.phq_total, PHQ_TOTAL_RANGE),
            ("gad_total", self.gad_total, GAD_TOTAL_RANGE),
            ("k10_total", self.k10_total, K10_TOTAL_RANGE),
            ("phq_item9", self.phq_item9, PHQ_ITEM9_RANGE),
        ];

        let errors: Vec<String> = checks
            .iter()
            .filter(|(_, value, (lo, hi))| !(*lo..=*hi).contains(value))
            .map(|(name, value, (lo, hi))| format!("{name} {value} out of range [{lo}, {hi}]"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Column names in the order the models were trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureOrder(Vec<String>);

impl FeatureOrder {
    /// The order `FeatureVector::to_array` produces.
    #[must_use]
    pub fn canonical() -> Self {
        Self(FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect())
    }

    /// Wrap an arbitrary order (e.g. one read back from disk).
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// True when this order matches the canonical one exactly.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.0.len() == N_FEATURES && self.0.iter().zip(FEATURE_NAMES).all(|(a, b)| a == b)
    }
}

impl Default for FeatureOrder {
    fn default() -> Self {
        Self::canonical()
    }
}
