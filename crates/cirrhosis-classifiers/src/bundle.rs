//! The persisted model artifact.
//!
//! A `ModelBundle` is everything inference needs in one JSON file: the
//! fitted preprocessing state (feature order, medians, encoders, target
//! encoding) and the trained estimator. It is written once at the end of
//! training and loaded once by the prediction service.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::Estimator;
use crate::preprocessing::{FieldValue, Preprocessor};

/// Bumped whenever the bundle layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    pub model_name: String,
    pub preprocessor: Preprocessor,
    pub model: Estimator,
}

impl ModelBundle {
    pub fn new(model_name: impl Into<String>, preprocessor: Preprocessor, model: Estimator) -> Self {
        ModelBundle {
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            model_name: model_name.into(),
            preprocessor,
            model,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.preprocessor.feature_names
    }

    /// Encoded labels the model can return.
    pub fn labels(&self) -> &[i32] {
        self.model.classes()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| ClassifierError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(|e| ClassifierError::io(path, e))?;
        log::info!("Model bundle '{}' saved to {}", self.model_name, path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ClassifierError::io(path, e))?;
        // Check the version before the layout it describes.
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;
        let found = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0) as u32;
        if found != FORMAT_VERSION {
            return Err(ClassifierError::VersionMismatch {
                expected: FORMAT_VERSION,
                found,
            });
        }
        let bundle: ModelBundle = serde_json::from_value(value)?;
        log::debug!(
            "Loaded bundle '{}' ({} features, created {})",
            bundle.model_name,
            bundle.feature_names().len(),
            bundle.created_at
        );
        Ok(bundle)
    }

    /// Predict the encoded stage label for one record keyed by column name.
    pub fn predict_record(&self, record: &HashMap<String, FieldValue>) -> Result<i32> {
        let row = self.preprocessor.transform_record(record)?;
        let x = Array2::from_shape_vec((1, row.len()), row)?;
        self.model
            .predict(&x)?
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::NotFitted(self.model_name.clone()))
    }
}
