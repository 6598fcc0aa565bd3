//! Training service: generator -> per-outcome trainer -> selector -> store.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{error, info, warn};

use crate::config::TrainingConfig;
use crate::domain::{FeatureOrder, Outcome};
use crate::ports::ModelStore;
use crate::training::{
    generate_population, train_outcome, FailedOutcome, TrainingError, TrainingReport,
};

/// Runs a full training pass and persists the selected models.
pub struct TrainingService<S: ModelStore + ?Sized> {
    store: Arc<S>,
    config: TrainingConfig,
}

impl<S: ModelStore + ?Sized> TrainingService<S> {
    pub fn new(store: Arc<S>, config: TrainingConfig) -> Self {
        Self { store, config }
    }

    /// Train with a generator seeded from `config.seed`.
    ///
    /// # Errors
    /// See [`Self::run_with_rng`].
    pub fn run(&self) -> Result<TrainingReport, TrainingError> {
        self.run_with_rng(&mut ChaCha8Rng::seed_from_u64(self.config.seed))
    }

    /// Generate the population, train every outcome and persist the results.
    ///
    /// An outcome that fails to train or save has its artifact removed; the
    /// remaining outcomes are still trained. The report is written either way.
    ///
    /// # Errors
    /// `InvalidConfig` if the population cannot be generated, `Persist` if the
    /// feature order cannot be saved, and `Incomplete` if any outcome failed.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<TrainingReport, TrainingError> {
        let cfg = &self.config;
        info!(
            "Starting training run: samples={} seed={} folds={} trees={}",
            cfg.samples, cfg.seed, cfg.trainer.cv_folds, cfg.trainer.forest.n_trees
        );

        let dataset = generate_population(cfg.samples, &cfg.generator, &cfg.labels, rng)?;
        let x = dataset.matrix();

        // One stream per outcome, so a failure in one cannot shift the others.
        let seeds: Vec<u64> = Outcome::ALL.iter().map(|_| rng.gen()).collect();

        let mut report = TrainingReport::new(cfg.samples, cfg.seed);
        for (outcome, seed) in Outcome::ALL.into_iter().zip(seeds) {
            let y = dataset.labels(outcome);
            let mut outcome_rng = ChaCha8Rng::seed_from_u64(seed);

            let result = train_outcome(outcome, &x, &y, &cfg.trainer, &mut outcome_rng)
                .and_then(|trained| {
                    self.store
                        .save_model(outcome, trained.selected_model())
                        .map_err(|source| TrainingError::Persist {
                            artifact: outcome.artifact_name(),
                            source,
                        })?;
                    Ok(trained.summary())
                });

            match result {
                Ok(summary) => report.outcomes.push(summary),
                Err(e) => {
                    error!("Training failed for {outcome}: {e}");
                    if let Err(inv) = self.store.invalidate(outcome) {
                        warn!("Could not remove previous {outcome} model: {inv}");
                    }
                    report.failed.push(FailedOutcome {
                        outcome,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.store
            .save_feature_order(&FeatureOrder::canonical())
            .map_err(|source| TrainingError::Persist {
                artifact: "feature order".into(),
                source,
            })?;

        if let Err(e) = self.store.save_report(&report) {
            warn!("Could not write training report: {e}");
        }

        if report.is_complete() {
            info!("Training run {} complete", report.run_id);
            Ok(report)
        } else {
            Err(TrainingError::Incomplete {
                failed: report.failed.iter().map(|f| f.outcome).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FsModelStore;
    use crate::application::InferenceService;
    use crate::domain::FeatureVector;
    use crate::model::fixtures::linear_model;
    use crate::model::{CalibratedModel, ForestConfig};
    use crate::ports::{ArtifactStatus, StoreError};
    use crate::training::{generate_population, TrainerConfig};
    use tempfile::TempDir;

    fn small_config(seed: u64) -> TrainingConfig {
        TrainingConfig {
            samples: 4000,
            seed,
            trainer: TrainerConfig {
                forest: ForestConfig {
                    n_trees: 10,
                    max_depth: 6,
                    workers: Some(2),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn respondent(phq: i64, gad: i64, k10: i64, item9: i64, asq: bool) -> FeatureVector {
        FeatureVector {
            phq_total: phq,
            gad_total: gad,
            k10_total: k10,
            phq_item9: item9,
            asq_any_yes: asq,
        }
    }

    /// Delegates to a real store but refuses to save one outcome.
    struct RefusingStore {
        inner: FsModelStore,
        refuse: Outcome,
    }

    impl ModelStore for RefusingStore {
        fn save_model(&self, outcome: Outcome, model: &CalibratedModel) -> Result<(), StoreError> {
            if outcome == self.refuse {
                return Err(StoreError::Io {
                    path: self.inner.artifact_path(outcome),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.save_model(outcome, model)
        }
        fn load_model(&self, outcome: Outcome) -> Result<CalibratedModel, StoreError> {
            self.inner.load_model(outcome)
        }
        fn save_feature_order(&self, order: &FeatureOrder) -> Result<(), StoreError> {
            self.inner.save_feature_order(order)
        }
        fn load_feature_order(&self) -> Result<FeatureOrder, StoreError> {
            self.inner.load_feature_order()
        }
        fn invalidate(&self, outcome: Outcome) -> Result<(), StoreError> {
            self.inner.invalidate(outcome)
        }
        fn save_report(&self, report: &TrainingReport) -> Result<(), StoreError> {
            self.inner.save_report(report)
        }
        fn artifact_status(&self) -> Vec<ArtifactStatus> {
            self.inner.artifact_status()
        }
    }

    #[test]
    fn test_end_to_end_training_then_serving() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsModelStore::new(dir.path()));
        let service = TrainingService::new(Arc::clone(&store), small_config(42));

        let report = service.run().expect("Should train");
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.is_complete());
        assert!(dir.path().join("training_report.json").is_file());
        for outcome in Outcome::ALL {
            let summary = report.summary(outcome).expect("Summary per outcome");
            assert_eq!(store.selected_kind(outcome), Some(summary.selected));
        }

        let inference = InferenceService::start(store.as_ref());
        assert!(inference.is_ready());

        let high = inference.predict(&respondent(20, 15, 40, 3, true)).unwrap();
        let low = inference.predict(&respondent(2, 1, 12, 0, false)).unwrap();
        assert!(
            high.suicidal_signal_pct > low.suicidal_signal_pct + 30.0,
            "high={} low={}",
            high.suicidal_signal_pct,
            low.suicidal_signal_pct
        );
        for p in [high, low] {
            for outcome in Outcome::ALL {
                assert!((0.0..=100.0).contains(&p.pct(outcome)));
            }
        }
    }

    #[test]
    fn test_selected_models_are_calibrated() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsModelStore::new(dir.path()));
        TrainingService::new(Arc::clone(&store), small_config(42))
            .run()
            .expect("Should train");
        let inference = InferenceService::start(store.as_ref());

        // Fresh population from another seed stands in for held-out data.
        let cfg = small_config(42);
        let holdout = generate_population(
            20_000,
            &cfg.generator,
            &cfg.labels,
            &mut ChaCha8Rng::seed_from_u64(2024),
        )
        .unwrap();

        for outcome in Outcome::ALL {
            let mean = holdout
                .samples
                .iter()
                .map(|s| inference.predict(&s.features).unwrap().pct(outcome) / 100.0)
                .sum::<f64>()
                / holdout.len() as f64;
            let prevalence = holdout.prevalence(outcome);
            assert!(
                (mean - prevalence).abs() < 0.03,
                "{outcome}: mean={mean} prevalence={prevalence}"
            );
        }
    }

    #[test]
    fn test_same_seed_reproduces_models() {
        let (a, b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let store_a = Arc::new(FsModelStore::new(a.path()));
        let store_b = Arc::new(FsModelStore::new(b.path()));
        TrainingService::new(Arc::clone(&store_a), small_config(9)).run().unwrap();
        TrainingService::new(Arc::clone(&store_b), small_config(9)).run().unwrap();

        for outcome in Outcome::ALL {
            assert_eq!(
                store_a.load_model(outcome).unwrap(),
                store_b.load_model(outcome).unwrap()
            );
        }
    }

    #[test]
    fn test_failed_outcome_is_invalidated_not_served_stale() {
        let dir = TempDir::new().unwrap();
        let inner = FsModelStore::new(dir.path());
        // A model from an earlier run that must not survive a failed retrain.
        inner.save_model(Outcome::Stress, &linear_model(Outcome::Stress)).unwrap();

        let store = Arc::new(RefusingStore {
            inner,
            refuse: Outcome::Stress,
        });
        let err = TrainingService::new(Arc::clone(&store), small_config(42))
            .run()
            .expect_err("Should report the failed outcome");

        match err {
            TrainingError::Incomplete { failed } => assert_eq!(failed, vec![Outcome::Stress]),
            other => panic!("Expected Incomplete, got {other:?}"),
        }
        let status = store.artifact_status();
        for s in status {
            assert_eq!(s.exists, s.outcome != Outcome::Stress, "{:?}", s.outcome);
        }
        assert!(!InferenceService::start(store.as_ref()).is_ready());
    }
}
