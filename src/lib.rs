//! # mindrisk
//!
//! Calibrated mental-health risk scoring from five survey features.
//!
//! This crate provides:
//! - A synthetic population generator with correlated instrument scores and
//!   probabilistic labels
//! - Per-outcome training of a calibrated linear and a calibrated ensemble
//!   candidate, with a deterministic selection rule
//! - Durable, integrity-checked model artifacts
//! - An inference service returning three independent risk percentages
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: survey features, outcomes, predictions, synthetic samples
//! - `model`: estimators, calibration and metrics
//! - `training`: generator, label model, splits, trainer and selector
//! - `ports`: trait definitions for model persistence and scoring
//! - `adapters`: file-system store, JSON-lines endpoint, log sanitizer
//! - `application`: training and inference services

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;
pub mod model;
pub mod ports;
pub mod training;

pub use application::{InferenceError, InferenceService, ModelBundle, TrainingService};
pub use config::Config;
pub use domain::{FeatureVector, Outcome, RiskPrediction};

/// Result type for mindrisk operations
pub type Result<T> = std::result::Result<T, MindriskError>;

/// Main error type for mindrisk
#[derive(Debug, thiserror::Error)]
pub enum MindriskError {
    #[error("Training failed: {0}")]
    Training(#[from] training::TrainingError),

    #[error("Model store operation failed: {0}")]
    Store(#[from] ports::StoreError),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
