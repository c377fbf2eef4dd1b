use thiserror::Error;

use crate::math::ShapeError;

pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Failures raised by the training pipeline and the model bundle.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("Missing expected column '{0}'")]
    MissingColumn(String),

    #[error("Column '{0}' has no non-missing values; median is undefined")]
    EmptyColumn(String),

    #[error("Invalid value '{value}' in column '{column}'")]
    InvalidValue { column: String, value: String },

    #[error("Record is missing feature columns: {}", missing.join(", "))]
    ColumnMismatch { missing: Vec<String> },

    #[error("Unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Class {class} has {count} members but resampling needs at least {required}")]
    InsufficientClassMembers {
        class: i32,
        count: usize,
        required: usize,
    },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Features and labels must have equal length ({rows} rows, {labels} labels)")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("Model '{0}' has not been fitted")]
    NotFitted(String),

    #[error("Model provider '{0}' is not available in this build")]
    Unavailable(String),

    #[error("Model '{model}' does not support {capability}")]
    Unsupported {
        model: String,
        capability: &'static str,
    },

    #[error("Candidate name '{0}' is used more than once")]
    DuplicateCandidate(String),

    #[error("Model '{model}' failed to fit: {reason}")]
    Fit { model: String, reason: String },

    #[error("No candidate models to evaluate")]
    NoCandidates,

    #[error("Artifact format version {found} does not match expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },
}

impl ClassifierError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ClassifierError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
