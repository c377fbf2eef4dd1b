use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cirrhosis_classifiers::preprocessing::FieldValue;

use super::error::{ServeError, ServeResult};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub data: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub stage: i32,
}

fn to_field(column: &str, value: Value) -> ServeResult<FieldValue> {
    match value {
        Value::Null => Ok(FieldValue::Missing),
        Value::Number(n) => n.as_f64().map(FieldValue::Number).ok_or_else(|| {
            ServeError::InvalidValue(format!("Invalid value '{}' in column '{}'", n, column))
        }),
        Value::String(s) => Ok(FieldValue::Text(s)),
        other => Err(ServeError::InvalidValue(format!(
            "Invalid value '{}' in column '{}'",
            other, column
        ))),
    }
}

/// `POST /predict`: one record in, one encoded stage out.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ServeResult<Json<PredictResponse>> {
    let Json(request) = payload.map_err(|e| ServeError::BadRequest(e.body_text()))?;

    let record = request
        .data
        .into_iter()
        .map(|(k, v)| {
            let field = to_field(&k, v)?;
            Ok((k, field))
        })
        .collect::<ServeResult<HashMap<String, FieldValue>>>()?;

    let stage = state.bundle.predict_record(&record)?;
    log::debug!("Predicted stage {} for {} fields", stage, record.len());
    Ok(Json(PredictResponse { stage }))
}
