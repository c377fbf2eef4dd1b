//! Multinomial logistic regression backed by `linfa-logistic`.
//!
//! Only compiled with the `linfa` feature; without it the provider reports
//! itself unavailable and the registry skips the candidate.
use linfa::prelude::*;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::{Array1, Array2 as NdArray2};
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::error::{ClassifierError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::{argmax_labels, check_fit_input, index_classes, ClassifierModel};
use crate::models::registry::{Capabilities, LOGISTIC_REGRESSION};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogisticParams {
    pub alpha: f64,
    pub max_iterations: u64,
}

impl LogisticParams {
    pub fn from_model_type(model_type: &ModelType) -> Option<Self> {
        match model_type {
            ModelType::LogisticRegression {
                alpha,
                max_iterations,
            } => Some(LogisticParams {
                alpha: *alpha,
                max_iterations: *max_iterations,
            }),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct LogisticClassifier {
    params: LogisticParams,
    classes: Vec<i32>,
    n_features: usize,
    model: Option<MultiFittedLogisticRegression<f64, usize>>,
}

impl LogisticClassifier {
    pub fn new(params: LogisticParams) -> Self {
        LogisticClassifier {
            params,
            classes: Vec::new(),
            n_features: 0,
            model: None,
        }
    }
}

fn to_ndarray(x: &Array2<f32>) -> Result<NdArray2<f64>> {
    NdArray2::from_shape_vec(x.shape(), x.as_slice().iter().map(|&v| v as f64).collect())
        .map_err(|e| ClassifierError::Fit {
            model: "logistic".to_string(),
            reason: e.to_string(),
        })
}

impl ClassifierModel for LogisticClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        check_fit_input(self.name(), x, y)?;
        let (classes, y_idx) = index_classes(y);
        self.model = if classes.len() > 1 {
            let dataset = Dataset::new(to_ndarray(x)?, Array1::from_vec(y_idx));
            let fitted = MultiLogisticRegression::<f64>::default()
                .alpha(self.params.alpha)
                .max_iterations(self.params.max_iterations)
                .fit(&dataset)
                .map_err(|e| ClassifierError::Fit {
                    model: self.name().to_string(),
                    reason: e.to_string(),
                })?;
            Some(fitted)
        } else {
            None
        };
        self.classes = classes;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_labels(&proba, &self.classes))
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        if self.classes.is_empty() {
            return Err(ClassifierError::NotFitted(self.name().to_string()));
        }
        if x.ncols() != self.n_features {
            return Err(ClassifierError::InvalidValue {
                column: "<features>".to_string(),
                value: format!("{} columns, expected {}", x.ncols(), self.n_features),
            });
        }
        let Some(model) = &self.model else {
            return Ok(Array2::from_elem((x.nrows(), 1), 1.0));
        };
        let proba = model.predict_probabilities(&to_ndarray(x)?);
        let values = proba.iter().map(|&p| p as f32).collect();
        Ok(Array2::from_shape_vec((x.nrows(), self.classes.len()), values)?)
    }

    fn classes(&self) -> &[i32] {
        &self.classes
    }

    fn capabilities(&self) -> Capabilities {
        LOGISTIC_REGRESSION.capabilities
    }

    fn name(&self) -> &str {
        "logistic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_three_blobs() {
        let mut x = Array2::with_columns(2);
        let mut y = Vec::new();
        for i in 0..45 {
            let class = (i % 3) as i32;
            let jitter = (i as f32 * 0.37).sin() * 0.3;
            x.push_row(&[class as f32 * 4.0 + jitter, -(class as f32) * 4.0 - jitter])
                .unwrap();
            y.push(class);
        }
        let mut model = LogisticClassifier::new(LogisticParams {
            alpha: 0.1,
            max_iterations: 200,
        });
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.shape(), (45, 3));
    }
}
