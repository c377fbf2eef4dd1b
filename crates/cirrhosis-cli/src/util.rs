use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// The training table must be an existing `.csv` or `.tsv` file.
pub fn validate_tsv_or_csv_file(path: &str) -> Result<()> {
    let pb = Path::new(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path),
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}

/// The artifact file name with `.config.json` in place of its extension.
pub fn config_snapshot_path(artifact_path: &str) -> String {
    Path::new(artifact_path)
        .with_extension("config.json")
        .display()
        .to_string()
}

pub fn write_json_file<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path))
}
