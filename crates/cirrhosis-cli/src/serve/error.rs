//! Error handling for the prediction service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use cirrhosis_classifiers::ClassifierError;

pub type ServeResult<T> = Result<T, ServeError>;

#[derive(Debug, Error)]
pub enum ServeError {
    /// Body is not JSON or lacks the `data` object.
    #[error("{0}")]
    BadRequest(String),

    #[error("Record is missing feature columns: {}", missing.join(", "))]
    ColumnMismatch { missing: Vec<String> },

    /// A field has the wrong type or an unseen category.
    #[error("{0}")]
    InvalidValue(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServeError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "status": 400 }),
            ),
            ServeError::ColumnMismatch { missing } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string(), "missing": missing, "status": 422 }),
            ),
            ServeError::InvalidValue(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": msg, "status": 422 }),
            ),
            ServeError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "status": 500 }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ClassifierError> for ServeError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::ColumnMismatch { missing } => ServeError::ColumnMismatch { missing },
            e @ (ClassifierError::InvalidValue { .. } | ClassifierError::UnknownCategory { .. }) => {
                ServeError::InvalidValue(e.to_string())
            }
            other => ServeError::Internal(other.to_string()),
        }
    }
}
