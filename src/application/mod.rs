//! Application layer: use cases orchestrating the domain, models and ports.

mod inference;
mod training;

pub use inference::{InferenceError, InferenceService, ModelBundle, ModelInfo};
pub use training::TrainingService;
