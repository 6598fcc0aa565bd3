//! Train the three risk models and write them to the models directory.
//!
//! Usage:
//!   train_models [--models-dir <dir>] [--samples <n>] [--seed <n>]
//!
//! Flags override the `MINDRISK_*` environment configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use mindrisk::adapters::FsModelStore;
use mindrisk::training::TrainingError;
use mindrisk::{Config, TrainingService};

fn usage() -> String {
    "Usage: train_models [--models-dir <dir>] [--samples <n>] [--seed <n>]".to_string()
}

fn parse_args(config: &mut Config) -> Result<bool> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("{name} needs a value\n{}", usage()))
        };
        match arg.as_str() {
            "--models-dir" => config.models_dir = PathBuf::from(value("--models-dir")?),
            "--samples" => {
                let n: usize = value("--samples")?
                    .parse()
                    .context("--samples must be an integer")?;
                if n == 0 {
                    bail!("--samples must be positive");
                }
                config.training.samples = n;
            }
            "--seed" => {
                config.training.seed = value("--seed")?
                    .parse()
                    .context("--seed must be an integer")?;
            }
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(false);
            }
            other => bail!("Unknown argument {other}\n{}", usage()),
        }
    }
    Ok(true)
}

fn main() -> Result<()> {
    let (mut config, warnings) = Config::from_env();
    if !parse_args(&mut config)? {
        return Ok(());
    }
    let _guard = mindrisk::logging::init(&config.log)?;
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    let store = Arc::new(FsModelStore::new(&config.models_dir));
    let service = TrainingService::new(store, config.training.clone());

    match service.run() {
        Ok(report) => {
            for s in &report.outcomes {
                tracing::info!(
                    "{}: selected {} (logreg PR={:.4} ROC={:.4}, rf PR={:.4} ROC={:.4})",
                    s.outcome,
                    s.selected,
                    s.linear.pr_auc,
                    s.linear.roc_auc,
                    s.ensemble.pr_auc,
                    s.ensemble.roc_auc
                );
            }
            tracing::info!("Models written to {:?}", config.models_dir);
            Ok(())
        }
        Err(e @ TrainingError::Incomplete { .. }) => {
            Err(e).context("Some outcomes have no model; the endpoint will refuse to serve")
        }
        Err(e) => Err(e).context("Training run aborted"),
    }
}
