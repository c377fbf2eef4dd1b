//! Capability-tagged estimator providers and the candidate registry.
//!
//! Each provider states at compile time whether it can be built in this
//! binary. Candidates naming an unavailable provider are dropped when the
//! registry is assembled instead of failing halfway through training.
use std::collections::HashSet;

use crate::config::{ModelConfig, ModelType};
use crate::error::{ClassifierError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub probabilities: bool,
    pub feature_importances: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    pub key: &'static str,
    pub available: bool,
    pub capabilities: Capabilities,
}

pub const RANDOM_FOREST: Provider = Provider {
    key: "random_forest",
    available: true,
    capabilities: Capabilities {
        probabilities: true,
        feature_importances: true,
    },
};

pub const GBDT: Provider = Provider {
    key: "gbdt",
    available: true,
    capabilities: Capabilities {
        probabilities: true,
        feature_importances: false,
    },
};

pub const LOGISTIC_REGRESSION: Provider = Provider {
    key: "logistic",
    available: cfg!(feature = "linfa"),
    capabilities: Capabilities {
        probabilities: true,
        feature_importances: false,
    },
};

pub fn provider_for(model_type: &ModelType) -> Provider {
    match model_type {
        ModelType::RandomForest { .. } => RANDOM_FOREST,
        ModelType::GBDT { .. } => GBDT,
        ModelType::LogisticRegression { .. } => LOGISTIC_REGRESSION,
    }
}

/// Ordered set of named candidates, each backed by an available provider.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    candidates: Vec<ModelConfig>,
}

impl ModelRegistry {
    pub fn from_configs(configs: Vec<ModelConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(configs.len());
        for config in configs {
            if !seen.insert(config.name.clone()) {
                return Err(ClassifierError::DuplicateCandidate(config.name));
            }
            let provider = provider_for(&config.model_type);
            if !provider.available {
                log::warn!(
                    "Skipping candidate '{}': provider '{}' is not compiled in",
                    config.name,
                    provider.key
                );
                continue;
            }
            candidates.push(config);
        }
        if candidates.is_empty() {
            return Err(ClassifierError::NoCandidates);
        }
        log::info!(
            "Model registry: {}",
            candidates
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(ModelRegistry { candidates })
    }

    pub fn candidates(&self) -> &[ModelConfig] {
        &self.candidates
    }

    pub fn get(&self, name: &str) -> Option<&ModelConfig> {
        self.candidates.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_candidates;

    #[test]
    fn unavailable_providers_are_skipped() {
        let registry = ModelRegistry::from_configs(default_candidates()).unwrap();
        let names: Vec<&str> = registry.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names[..2], ["Random Forest", "Gradient Boosting"]);
        assert_eq!(
            names.contains(&"Logistic Regression"),
            LOGISTIC_REGRESSION.available
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let configs = vec![
            ModelConfig::new("m", ModelType::random_forest()),
            ModelConfig::new("m", ModelType::gbdt()),
        ];
        assert!(matches!(
            ModelRegistry::from_configs(configs),
            Err(ClassifierError::DuplicateCandidate(n)) if n == "m"
        ));
    }

    #[test]
    fn empty_registry_is_an_error() {
        assert!(matches!(
            ModelRegistry::from_configs(vec![]),
            Err(ClassifierError::NoCandidates)
        ));
    }
}
