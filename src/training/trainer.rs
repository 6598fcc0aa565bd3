//! Per-outcome training: split, fit both calibrated candidates, evaluate on
//! the held-out partition and select.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::report::OutcomeSummary;
use super::selector::{select, SelectorConfig};
use super::split::{stratified_kfold, stratified_split};
use super::TrainingError;
use crate::domain::Outcome;
use crate::model::{
    CalibratedModel, CandidateKind, CandidateSpec, ForestConfig, LogisticConfig, Row, Scores,
};

/// Trainer parameters shared by all outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub logistic: LogisticConfig,
    pub forest: ForestConfig,
    pub selector: SelectorConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 3,
            logistic: LogisticConfig::default(),
            forest: ForestConfig::default(),
            selector: SelectorConfig::default(),
        }
    }
}

/// A fitted candidate with its held-out scores.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub model: CalibratedModel,
    pub scores: Scores,
}

/// Both candidates for one outcome and the selection between them.
#[derive(Debug, Clone)]
pub struct TrainedOutcome {
    pub outcome: Outcome,
    pub prevalence: f64,
    pub train_size: usize,
    pub test_size: usize,
    pub linear: CandidateResult,
    pub ensemble: CandidateResult,
    pub selected: CandidateKind,
}

impl TrainedOutcome {
    #[must_use]
    pub fn selected_model(&self) -> &CalibratedModel {
        match self.selected {
            CandidateKind::Linear => &self.linear.model,
            CandidateKind::Ensemble => &self.ensemble.model,
        }
    }

    #[must_use]
    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            outcome: self.outcome,
            prevalence: self.prevalence,
            train_size: self.train_size,
            test_size: self.test_size,
            linear: self.linear.scores,
            ensemble: self.ensemble.scores,
            selected: self.selected,
        }
    }
}

fn fit_candidate<R: Rng + ?Sized>(
    outcome: Outcome,
    spec: &CandidateSpec,
    split: (&[Row], &[bool], &[Vec<usize>]),
    test: (&[Row], &[bool]),
    rng: &mut R,
) -> Result<CandidateResult, TrainingError> {
    let (x, y, folds) = split;
    let model = CalibratedModel::fit(outcome, spec, x, y, folds, rng)
        .map_err(|e| TrainingError::from_fit(outcome, e))?;
    let probs = model.predict_many(test.0);
    let scores =
        Scores::evaluate(&probs, test.1).map_err(|e| TrainingError::from_fit(outcome, e))?;

    info!(
        "[{outcome}] {}: PR AUC={:.4} ROC AUC={:.4}",
        spec.kind(),
        scores.pr_auc,
        scores.roc_auc
    );
    Ok(CandidateResult { model, scores })
}

/// Train and select the model for one outcome.
///
/// # Errors
/// `DegenerateData` when the labels cannot be stratified or a partition holds
/// a single class; `Fit` for numerical failures.
pub fn train_outcome<R: Rng + ?Sized>(
    outcome: Outcome,
    x: &[Row],
    y: &[bool],
    config: &TrainerConfig,
    rng: &mut R,
) -> Result<TrainedOutcome, TrainingError> {
    if x.len() != y.len() {
        return Err(TrainingError::InvalidConfig(format!(
            "{} rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    let fail = |e| TrainingError::from_fit(outcome, e);

    let (train_idx, test_idx) = stratified_split(y, config.test_fraction, rng).map_err(fail)?;
    let (train_x, train_y): (Vec<Row>, Vec<bool>) =
        train_idx.iter().map(|&i| (x[i], y[i])).unzip();
    let (test_x, test_y): (Vec<Row>, Vec<bool>) = test_idx.iter().map(|&i| (x[i], y[i])).unzip();
    let folds = stratified_kfold(&train_y, config.cv_folds, rng).map_err(fail)?;

    let prevalence = y.iter().filter(|&&v| v).count() as f64 / y.len() as f64;
    info!(
        "[{outcome}] train={} test={} prevalence={prevalence:.3}",
        train_x.len(),
        test_x.len()
    );

    let split = (train_x.as_slice(), train_y.as_slice(), folds.as_slice());
    let test = (test_x.as_slice(), test_y.as_slice());
    let linear = fit_candidate(
        outcome,
        &CandidateSpec::Linear(config.logistic.clone()),
        split,
        test,
        rng,
    )?;
    let ensemble = fit_candidate(
        outcome,
        &CandidateSpec::Ensemble(config.forest.clone()),
        split,
        test,
        rng,
    )?;

    let selected = select(&linear.scores, &ensemble.scores, &config.selector);
    info!("[{outcome}] selected {selected}");

    Ok(TrainedOutcome {
        outcome,
        prevalence,
        train_size: train_x.len(),
        test_size: test_x.len(),
        linear,
        ensemble,
        selected,
    })
}
