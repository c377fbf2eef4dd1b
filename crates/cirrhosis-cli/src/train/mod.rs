pub mod input;

use anyhow::{Context, Result};

use cirrhosis_classifiers::config::PipelineConfig;
use cirrhosis_classifiers::pipeline;

use crate::util::{config_snapshot_path, write_json_file};

/// Run the training pipeline and record the configuration next to the
/// artifact.
pub fn run_training(config: &PipelineConfig) -> Result<()> {
    log::info!("Training on {}", config.data_path);
    let outcome = pipeline::run(config)
        .with_context(|| format!("Training failed on {}", config.data_path))?;

    log::info!(
        "Selected '{}' (test accuracy {:.3}); model saved to {}",
        outcome.best_model,
        outcome.report.accuracy,
        config.artifact_path
    );

    let snapshot = config_snapshot_path(&config.artifact_path);
    write_json_file(&snapshot, config)?;
    log::debug!("Configuration written to {}", snapshot);
    Ok(())
}
