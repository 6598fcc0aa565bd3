//! mindrisk: risk prediction endpoint.
//!
//! Loads the model bundle once, then answers newline-delimited JSON requests
//! from stdin on stdout. Logs go to stderr or a file, never stdout.

use std::io::{stdin, stdout};

use anyhow::Result;

use mindrisk::adapters::{endpoint, FsModelStore};
use mindrisk::{Config, InferenceService};

fn main() -> Result<()> {
    let (config, warnings) = Config::from_env();
    let _guard = mindrisk::logging::init(&config.log)?;
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    tracing::info!("Starting mindrisk endpoint, models in {:?}", config.models_dir);

    let store = FsModelStore::new(&config.models_dir);
    let service = InferenceService::start(&store);
    if !service.is_ready() {
        tracing::warn!("Serving in unavailable mode; predictions will be refused");
    }

    let stats = endpoint::serve(&service, &store, stdin().lock(), stdout().lock())?;

    tracing::info!(
        "mindrisk endpoint shutdown: {} requests, {} errors",
        stats.requests,
        stats.errors
    );
    Ok(())
}
