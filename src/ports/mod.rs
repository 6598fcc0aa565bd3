//! Ports layer: Trait definitions for external operations.
//!
//! The application talks to persisted models and to the models themselves
//! only through these traits, so tests can inject in-memory fakes.

mod model_store;
mod risk_model;

pub use model_store::{ArtifactStatus, ModelStore, StoreError};
pub use risk_model::RiskModel;
