use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelType};
use crate::error::{ClassifierError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gbdt::{GBDTClassifier, GBDTParams};
use crate::models::random_forest::{ForestParams, RandomForestClassifier};
use crate::models::registry::{provider_for, Capabilities};

/// Every concrete estimator the crate can build. Serialised with an
/// externally tagged variant so a persisted bundle records which provider
/// produced it.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    RandomForest(RandomForestClassifier),
    Gbdt(GBDTClassifier),
    #[cfg(feature = "linfa")]
    Logistic(crate::models::logistic::LogisticClassifier),
}

impl Estimator {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Estimator::RandomForest(m) => m,
            Estimator::Gbdt(m) => m,
            #[cfg(feature = "linfa")]
            Estimator::Logistic(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Estimator::RandomForest(m) => m,
            Estimator::Gbdt(m) => m,
            #[cfg(feature = "linfa")]
            Estimator::Logistic(m) => m,
        }
    }
}

impl ClassifierModel for Estimator {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.inner().predict_proba(x)
    }

    fn feature_importances(&self) -> Option<Vec<f32>> {
        self.inner().feature_importances()
    }

    fn classes(&self) -> &[i32] {
        self.inner().classes()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner().capabilities()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Build an unfitted estimator from a `ModelConfig`.
///
/// Fails with `Unavailable` when the provider was not compiled into this
/// build.
pub fn build_model(config: &ModelConfig) -> Result<Estimator> {
    let provider = provider_for(&config.model_type);
    if !provider.available {
        return Err(ClassifierError::Unavailable(provider.key.to_string()));
    }
    match &config.model_type {
        model_type @ ModelType::RandomForest { .. } => Ok(Estimator::RandomForest(
            RandomForestClassifier::new(ForestParams::from_model_type(model_type).unwrap_or_default()),
        )),
        model_type @ ModelType::GBDT { .. } => {
            let params = GBDTParams::from_model_type(model_type)
                .ok_or_else(|| ClassifierError::Unavailable(provider.key.to_string()))?;
            Ok(Estimator::Gbdt(GBDTClassifier::new(params)))
        }
        #[cfg(feature = "linfa")]
        model_type @ ModelType::LogisticRegression { .. } => {
            use crate::models::logistic::{LogisticClassifier, LogisticParams};
            let params = LogisticParams::from_model_type(model_type)
                .ok_or_else(|| ClassifierError::Unavailable(provider.key.to_string()))?;
            Ok(Estimator::Logistic(LogisticClassifier::new(params)))
        }
        #[cfg(not(feature = "linfa"))]
        ModelType::LogisticRegression { .. } => {
            Err(ClassifierError::Unavailable(provider.key.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_available_provider() {
        let rf = build_model(&ModelType::random_forest().into()).unwrap();
        assert_eq!(rf.name(), "random_forest");
        assert!(rf.capabilities().feature_importances);

        let gbdt = build_model(&ModelType::gbdt().into()).unwrap();
        assert_eq!(gbdt.name(), "gbdt");
        assert!(gbdt.capabilities().probabilities);
    }

    #[cfg(not(feature = "linfa"))]
    #[test]
    fn logistic_is_unavailable_without_linfa() {
        assert!(matches!(
            build_model(&ModelType::logistic_regression().into()),
            Err(ClassifierError::Unavailable(k)) if k == "logistic"
        ));
    }
}
