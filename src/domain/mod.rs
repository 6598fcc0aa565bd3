//! Domain layer: Core types for survey-based risk scoring.
//!
//! Pure types with serde support and no I/O.

mod features;
mod outcome;
mod sample;
pub mod survey;

pub use features::{
    FeatureOrder, FeatureVector, BINARY_COLUMN, FEATURE_NAMES, GAD_TOTAL_RANGE, K10_TOTAL_RANGE,
    N_FEATURES, PHQ_ITEM9_RANGE, PHQ_TOTAL_RANGE,
};
pub use outcome::{clamp_probability, soften, Outcome, RiskPrediction, DEFAULT_SOFTEN_EPS};
pub use sample::{Dataset, SyntheticSample};
pub use survey::{assess, SurveyAssessment, Tier};
