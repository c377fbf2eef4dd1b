use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One named candidate in the model registry.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
///
/// Every variant is always representable so configuration files stay
/// portable; whether a provider can actually be built is answered by
/// `models::registry`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
        bootstrap: bool,
        seed: u64,
    },
    GBDT {
        learning_rate: f32,
        max_depth: u32,
        num_boost_round: u32,
        training_optimization_level: u8,
    },
    LogisticRegression {
        alpha: f64,
        max_iterations: u64,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::random_forest()
    }
}

impl ModelType {
    pub fn random_forest() -> Self {
        ModelType::RandomForest {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }

    pub fn gbdt() -> Self {
        ModelType::GBDT {
            learning_rate: 0.1,
            max_depth: 6,
            num_boost_round: 100,
            training_optimization_level: 2,
        }
    }

    pub fn logistic_regression() -> Self {
        ModelType::LogisticRegression {
            alpha: 1.0,
            max_iterations: 200,
        }
    }

    /// Short identifier used on the command line and in file names.
    pub fn key(&self) -> &'static str {
        match self {
            ModelType::RandomForest { .. } => "random_forest",
            ModelType::GBDT { .. } => "gbdt",
            ModelType::LogisticRegression { .. } => "logistic",
        }
    }

    /// Display name used in the candidate registry.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::RandomForest { .. } => "Random Forest",
            ModelType::GBDT { .. } => "Gradient Boosting",
            ModelType::LogisticRegression { .. } => "Logistic Regression",
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(ModelType::random_forest()),
            "gbdt" | "gradient_boosting" => Ok(ModelType::gbdt()),
            "logistic" | "logistic_regression" => Ok(ModelType::logistic_regression()),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are: random_forest, gbdt, logistic",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            name: name.into(),
            model_type,
        }
    }
}

impl From<ModelType> for ModelConfig {
    fn from(model_type: ModelType) -> Self {
        ModelConfig::new(model_type.display_name(), model_type)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelType::default().into()
    }
}

/// The candidates cross-validated when no configuration lists any.
pub fn default_candidates() -> Vec<ModelConfig> {
    vec![
        ModelType::random_forest().into(),
        ModelType::gbdt().into(),
        ModelType::logistic_regression().into(),
    ]
}

/// Parameters of one training run. All fields have defaults so a partial
/// JSON file is enough.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_path: String,
    pub target_column: String,
    pub id_column: Option<String>,
    pub test_size: f64,
    pub seed: u64,
    pub n_splits: usize,
    pub shuffle: bool,
    pub resample: bool,
    pub k_neighbors: usize,
    pub top_features: usize,
    pub artifact_path: String,
    pub report_path: Option<String>,
    pub models: Vec<ModelConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: "pbc_dataset.csv".to_string(),
            target_column: "stage".to_string(),
            id_column: Some("patient_id".to_string()),
            test_size: 0.2,
            seed: 42,
            n_splits: 5,
            shuffle: true,
            resample: true,
            k_neighbors: 5,
            top_features: 10,
            artifact_path: "best_cirrhosis_model.json".to_string(),
            report_path: Some("cirrhosis_report.html".to_string()),
            models: default_candidates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_type_from_str_aliases() {
        assert_eq!("rf".parse::<ModelType>().unwrap().key(), "random_forest");
        assert_eq!("Gradient-Boosting".parse::<ModelType>().unwrap().key(), "gbdt");
        assert!("tabpfn".parse::<ModelType>().is_err());
    }

    #[test]
    fn model_config_flattens_variant() {
        let cfg = ModelConfig::from(ModelType::gbdt());
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["name"], "Gradient Boosting");
        assert_eq!(json["GBDT"]["max_depth"], 6);
        let back: ModelConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_pipeline_config_uses_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(r#"{"n_splits": 3}"#).unwrap();
        assert_eq!(cfg.n_splits, 3);
        assert_eq!(cfg.target_column, "stage");
        assert_eq!(cfg.models.len(), 3);
    }
}
