use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::error::{ClassifierError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::{argmax_labels, check_fit_input, index_classes, ClassifierModel};
use crate::models::registry::{Capabilities, GBDT as GBDT_PROVIDER};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GBDTParams {
    pub learning_rate: f32,
    pub max_depth: u32,
    pub num_boost_round: u32,
    pub training_optimization_level: u8,
}

impl GBDTParams {
    pub fn from_model_type(model_type: &ModelType) -> Option<Self> {
        match model_type {
            ModelType::GBDT {
                learning_rate,
                max_depth,
                num_boost_round,
                training_optimization_level,
            } => Some(GBDTParams {
                learning_rate: *learning_rate,
                max_depth: *max_depth,
                num_boost_round: *num_boost_round,
                training_optimization_level: *training_optimization_level,
            }),
            _ => None,
        }
    }
}

/// Gradient Boosting Decision Tree (GBDT) classifier
///
/// The underlying booster is binary (log-likelihood loss on ±1 labels), so
/// two classes are handled by a single booster and more classes by one
/// booster per class whose scores are normalised into probabilities.
#[derive(Serialize, Deserialize)]
pub struct GBDTClassifier {
    params: GBDTParams,
    classes: Vec<i32>,
    n_features: usize,
    models: Vec<GBDT>,
}

impl GBDTClassifier {
    pub fn new(params: GBDTParams) -> Self {
        GBDTClassifier {
            params,
            classes: Vec::new(),
            n_features: 0,
            models: Vec::new(),
        }
    }

    fn booster(&self, x: &Array2<f32>, positive: impl Fn(usize) -> bool) -> GBDT {
        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.params.learning_rate);
        config.set_max_depth(self.params.max_depth);
        config.set_iterations(self.params.num_boost_round as usize);
        config.set_debug(false);
        config.set_training_optimization_level(self.params.training_optimization_level);
        config.set_loss("LogLikelyhood");

        let mut gbdt = GBDT::new(&config);
        let mut train_x = DataVec::new();
        for row in 0..x.nrows() {
            let label = if positive(row) { 1.0 } else { -1.0 };
            train_x.push(Data::new_training_data(
                x.row_slice(row).to_vec(),
                1.0,
                label,
                None,
            ));
        }
        gbdt.fit(&mut train_x);
        gbdt
    }

    fn to_data(x: &Array2<f32>) -> DataVec {
        let mut test_x = DataVec::new();
        for row in 0..x.nrows() {
            test_x.push(Data::new_training_data(x.row_slice(row).to_vec(), 1.0, 0.0, None));
        }
        test_x
    }
}

impl ClassifierModel for GBDTClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        check_fit_input(self.name(), x, y)?;
        let (classes, y_idx) = index_classes(y);

        self.models = match classes.len() {
            1 => Vec::new(),
            2 => vec![self.booster(x, |r| y_idx[r] == 1)],
            k => (0..k)
                .map(|c| self.booster(x, |r| y_idx[r] == c))
                .collect(),
        };
        self.classes = classes;
        self.n_features = x.ncols();
        log::debug!(
            "GBDT fitted: {} booster(s) for {} classes",
            self.models.len(),
            self.classes.len()
        );
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
        let n = x.nrows();
        let k = self.classes.len();
        let mut out = Array2::from_elem((n, k), 0f32);
        if k == 1 {
            for r in 0..n {
                out[(r, 0)] = 1.0;
            }
            return Ok(out);
        }

        let data = Self::to_data(x);
        let scores: Vec<Vec<f32>> = self
            .models
            .iter()
            .map(|m| m.predict(&data).into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
            .collect();

        for r in 0..n {
            if k == 2 {
                let p = scores[0][r];
                out[(r, 0)] = 1.0 - p;
                out[(r, 1)] = p;
                continue;
            }
            let total: f32 = scores.iter().map(|s| s[r]).sum();
            for c in 0..k {
                out[(r, c)] = if total > 0.0 {
                    scores[c][r] / total
                } else {
                    1.0 / k as f32
                };
            }
        }
        Ok(out)
    }

    fn classes(&self) -> &[i32] {
        &self.classes
    }

    fn capabilities(&self) -> Capabilities {
        GBDT_PROVIDER.capabilities
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GBDTParams {
        GBDTParams {
            learning_rate: 0.1,
            max_depth: 4,
            num_boost_round: 20,
            training_optimization_level: 2,
        }
    }

    #[test]
    fn test_gbdt_classifier_binary() {
        // Label follows the sign of the second feature
        let x = Array2::from_shape_vec(
            (10, 3),
            vec![
                0.1, 1.0, 5.0, 0.4, -1.0, 5.0, 0.6, 1.0, 5.0, 0.9, -1.0, 5.0, 1.2, 1.0, 5.0, 1.5,
                -1.0, 5.0, 1.8, 1.0, 5.0, 2.1, -1.0, 5.0, 2.4, 1.0, 5.0, 2.7, -1.0, 5.0,
            ],
        )
        .unwrap();
        let y: Vec<i32> = (0..10).map(|i| if i % 2 == 0 { 0 } else { 1 }).collect();

        let mut classifier = GBDTClassifier::new(params());
        classifier.fit(&x, &y).unwrap();

        let proba = classifier.predict_proba(&x).unwrap();
        assert_eq!(proba.shape(), (10, 2));
        for row in proba.rows() {
            assert!((row[0] + row[1] - 1.0).abs() < 1e-5);
        }
        assert_eq!(classifier.predict(&x).unwrap(), y);
    }

    #[test]
    fn multiclass_uses_one_booster_per_class() {
        let mut x = Array2::with_columns(2);
        let mut y = Vec::new();
        for i in 0..30 {
            let class = (i % 3) as i32;
            x.push_row(&[class as f32 * 10.0 + (i as f32 * 0.05), 1.0]).unwrap();
            y.push(class + 1);
        }
        let mut classifier = GBDTClassifier::new(params());
        classifier.fit(&x, &y).unwrap();
        assert_eq!(classifier.classes(), &[1, 2, 3]);
        assert_eq!(classifier.models.len(), 3);

        let pred = classifier.predict(&x).unwrap();
        let correct = pred.iter().zip(&y).filter(|(a, b)| a == b).count();
        assert!(correct >= 27, "only {correct} of 30 correct");
    }

    #[test]
    fn single_class_always_predicts_it() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let mut classifier = GBDTClassifier::new(params());
        classifier.fit(&x, &[4, 4, 4]).unwrap();
        assert_eq!(classifier.predict(&x).unwrap(), vec![4, 4, 4]);
        assert!(classifier.feature_importances().is_none());
    }
}
