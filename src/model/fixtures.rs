//! Hand-built models for tests that need an artifact without a training run.

use super::{
    CalibratedFold, CalibratedModel, CandidateKind, ColumnStandardizer, Estimator,
    LogisticRegression, Pipeline, PlattScaling,
};
use crate::domain::Outcome;

/// Three-fold linear model with awkward floats, so exact round-trips are tested.
///
/// Every coefficient is non-zero and positive severity raises the score.
pub(crate) fn linear_model(outcome: Outcome) -> CalibratedModel {
    let fold = |shift: f64| CalibratedFold {
        pipeline: Pipeline {
            scaler: ColumnStandardizer {
                mean: [13.1 + shift, 10.3, 30.7, 1.9, 0.0],
                scale: [4.9, 3.7, 7.1, 0.8, 1.0],
            },
            estimator: Estimator::Logistic(LogisticRegression {
                coef: [0.1 + 0.2, 1.0 / 3.0, 2.0_f64.sqrt() / 10.0, 0.45, 0.7],
                intercept: -2.123_456_789_012_345,
            }),
        },
        platt: PlattScaling {
            a: 0.987_654_321,
            b: -0.1 * shift,
        },
    };
    CalibratedModel {
        outcome,
        kind: CandidateKind::Linear,
        folds: vec![fold(0.0), fold(1.0), fold(2.0)],
    }
}

/// Ensemble model whose forests hold a single tree with no nodes.
pub(crate) fn hollow_forest_model(outcome: Outcome) -> CalibratedModel {
    let mut model = linear_model(outcome);
    model.kind = CandidateKind::Ensemble;
    for fold in &mut model.folds {
        fold.pipeline.estimator = Estimator::Forest(
            serde_json::from_str(r#"{"trees": [{"nodes": []}]}"#).expect("forest JSON"),
        );
    }
    model
}
