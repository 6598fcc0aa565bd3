//! Choice between the calibrated linear and ensemble candidates.
//!
//! Precision-recall is the primary criterion. The ensemble must beat the
//! linear model by more than the margin, or tie it on PR AUC and beat it on
//! ROC AUC by more than the margin. Anything else keeps the linear model.

use serde::{Deserialize, Serialize};

use crate::model::{CandidateKind, Scores};

/// Slack for float noise when a difference sits exactly on the margin.
const BOUNDARY_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub margin: f64,
    /// How far below the linear PR AUC the ensemble may be and still tie
    pub tie_tolerance: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            margin: 0.005,
            tie_tolerance: 1e-9,
        }
    }
}

fn exceeds(delta: f64, margin: f64) -> bool {
    delta - margin > BOUNDARY_TOLERANCE
}

/// Pick the candidate to persist. Ties go to the linear model.
#[must_use]
pub fn select(linear: &Scores, ensemble: &Scores, config: &SelectorConfig) -> CandidateKind {
    let d_pr = ensemble.pr_auc - linear.pr_auc;
    let d_roc = ensemble.roc_auc - linear.roc_auc;

    let pr_win = exceeds(d_pr, config.margin);
    let roc_win = d_pr >= -config.tie_tolerance && exceeds(d_roc, config.margin);
    if pr_win || roc_win {
        CandidateKind::Ensemble
    } else {
        CandidateKind::Linear
    }
}
