//! Environment-driven configuration.
//!
//! Every setting has a default; a variable that is set but does not parse
//! (or fails its range check) is ignored with a warning. Configuration is
//! read before logging exists, so the warnings are returned to the caller
//! to emit once the subscriber is installed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::training::{GeneratorConfig, LabelModelConfig, TrainerConfig};

/// Where formatted log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    Stderr,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub mode: LogMode,
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            mode: LogMode::Stderr,
            file: PathBuf::from("mindrisk.log"),
        }
    }
}

/// Everything a training run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub samples: usize,
    /// Master seed for generation, splits, folds and forests
    pub seed: u64,
    pub generator: GeneratorConfig,
    pub labels: LabelModelConfig,
    pub trainer: TrainerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: 100_000,
            seed: 42,
            generator: GeneratorConfig::default(),
            labels: LabelModelConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub models_dir: PathBuf,
    pub training: TrainingConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            training: TrainingConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn invalid(name: &str, raw: &str) -> String {
    format!("Ignoring invalid {name}={raw:?}, keeping default")
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    warnings: &mut Vec<String>,
    name: &str,
    valid: impl Fn(&T) -> bool,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) if valid(&v) => Some(v),
        _ => {
            warnings.push(invalid(name, &raw));
            None
        }
    }
}

fn positive(x: &f64) -> bool {
    x.is_finite() && *x > 0.0
}

fn non_negative(x: &f64) -> bool {
    x.is_finite() && *x >= 0.0
}

impl Config {
    /// Read `MINDRISK_*` variables from the process environment.
    ///
    /// Returns the configuration and one warning per ignored variable.
    #[must_use]
    pub fn from_env() -> (Self, Vec<String>) {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name -> value source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let mut cfg = Self::default();
        let mut warnings = Vec::new();
        let w = &mut warnings;
        let training = &mut cfg.training;

        if let Some(dir) = lookup("MINDRISK_MODELS_DIR").filter(|v| !v.trim().is_empty()) {
            cfg.models_dir = PathBuf::from(dir.trim());
        }
        if let Some(n) = parsed(&lookup, w, "MINDRISK_SAMPLES", |n: &usize| *n > 0) {
            training.samples = n;
        }
        if let Some(seed) = parsed(&lookup, w, "MINDRISK_SEED", |_: &u64| true) {
            training.seed = seed;
        }
        if let Some(f) = parsed(&lookup, w, "MINDRISK_TEST_FRACTION", |f: &f64| *f > 0.0 && *f < 1.0) {
            training.trainer.test_fraction = f;
        }
        if let Some(k) = parsed(&lookup, w, "MINDRISK_CV_FOLDS", |k: &usize| *k >= 2) {
            training.trainer.cv_folds = k;
        }
        if let Some(m) = parsed(&lookup, w, "MINDRISK_SELECTION_MARGIN", non_negative) {
            training.trainer.selector.margin = m;
        }
        if let Some(s) = parsed(&lookup, w, "MINDRISK_LABEL_NOISE_STD", non_negative) {
            training.labels.noise_std = s;
        }
        if let Some(s) = parsed(&lookup, w, "MINDRISK_ASQ_NOISE_STD", non_negative) {
            training.generator.asq_noise_std = s;
        }
        if let Some(c) = parsed(&lookup, w, "MINDRISK_LOGREG_C", positive) {
            training.trainer.logistic.c = c;
        }
        if let Some(n) = parsed(&lookup, w, "MINDRISK_FOREST_TREES", |n: &usize| *n > 0) {
            training.trainer.forest.n_trees = n;
        }
        if let Some(d) = parsed(&lookup, w, "MINDRISK_FOREST_MAX_DEPTH", |d: &usize| *d > 0) {
            training.trainer.forest.max_depth = d;
        }
        if let Some(w) = parsed(&lookup, w, "MINDRISK_WORKERS", |w: &usize| *w > 0) {
            training.trainer.forest.workers = Some(w);
        }

        if let Some(mode) = lookup("MINDRISK_LOG_MODE") {
            match mode.trim().to_ascii_lowercase().as_str() {
                "file" => cfg.log.mode = LogMode::File,
                "stderr" => cfg.log.mode = LogMode::Stderr,
                _ => w.push(invalid("MINDRISK_LOG_MODE", &mode)),
            }
        }
        if let Some(file) = lookup("MINDRISK_LOG_FILE").filter(|v| !v.trim().is_empty()) {
            cfg.log.file = PathBuf::from(file.trim());
        }

        (cfg, warnings)
    }
}
