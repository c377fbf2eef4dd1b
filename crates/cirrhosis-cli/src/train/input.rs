use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;

use cirrhosis_classifiers::config::{ModelConfig, ModelType, PipelineConfig};

use crate::util::validate_tsv_or_csv_file;

/// Read a JSON pipeline configuration. Missing fields take their defaults.
pub fn load_train_config(config_path: &PathBuf) -> Result<PipelineConfig> {
    let config_json = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
    let config: PipelineConfig = serde_json::from_str(&config_json)
        .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
    Ok(config)
}

/// Resolve the configuration for `cirrhosis train`: the config file (or the
/// defaults) with command line overrides applied on top.
pub fn from_arguments(matches: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_train_config(path)?,
        None => {
            eprintln!("[cirrhosis::train] No config file provided; using defaults.");
            let config = PipelineConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
            config
        }
    };

    if let Some(data) = matches.get_one::<String>("data") {
        config.data_path = data.clone();
    }
    validate_tsv_or_csv_file(&config.data_path)?;

    if let Some(output_file) = matches.get_one::<String>("output_file") {
        config.artifact_path = output_file.clone();
    }

    if let Some(report) = matches.get_one::<String>("report") {
        config.report_path = Some(report.clone());
    }
    if matches.get_flag("no_report") {
        config.report_path = None;
    }

    if let Some(names) = matches.get_many::<String>("models") {
        let names: Vec<&str> = names.map(String::as_str).collect();
        config.models = select_models(&config.models, &names)?;
    }

    Ok(config)
}

/// Pick candidates by display name or provider key, in the order given.
/// Names that match no configured candidate are parsed as a model type and
/// use that type's defaults.
pub fn select_models(configured: &[ModelConfig], names: &[&str]) -> Result<Vec<ModelConfig>> {
    names
        .iter()
        .map(|name| {
            let name = name.trim();
            if let Some(found) = configured
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(name) || m.model_type.key() == name)
            {
                return Ok(found.clone());
            }
            let model_type = ModelType::from_str(name).map_err(anyhow::Error::msg)?;
            Ok(ModelConfig::from(model_type))
        })
        .collect()
}
