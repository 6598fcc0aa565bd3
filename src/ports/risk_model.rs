//! Risk model port: probability of one outcome for one respondent.

use crate::domain::FeatureVector;

/// A loaded, immutable per-outcome predictor.
///
/// Implementations are shared by every concurrent request, so they must be
/// `Send + Sync` and must not mutate state while predicting.
pub trait RiskModel: Send + Sync {
    /// Probability of the positive class.
    ///
    /// Nominally in [0, 1]; callers clamp before presenting it.
    fn predict_proba(&self, features: &FeatureVector) -> f64;
}

