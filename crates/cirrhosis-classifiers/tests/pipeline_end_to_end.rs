use std::collections::HashMap;

use cirrhosis_classifiers::bundle::ModelBundle;
use cirrhosis_classifiers::config::{ModelConfig, ModelType, PipelineConfig};
use cirrhosis_classifiers::io::RawTable;
use cirrhosis_classifiers::pipeline::run_on_table;
use cirrhosis_classifiers::preprocessing::FieldValue;
use cirrhosis_classifiers::ClassifierError;
use tempfile::TempDir;

/// 100 rows, three numeric features, stage 1/2/3 in an 80/15/5 split, with
/// a few missing cells.
fn stage_table() -> RawTable {
    let headers = ["bilirubin", "albumin", "platelets", "stage"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows = (0..100)
        .map(|i| {
            let stage = if i < 80 {
                1
            } else if i < 95 {
                2
            } else {
                3
            };
            let base = stage as f64;
            let jitter = (i as f64 * 0.618).fract();
            let bilirubin = if i % 17 == 3 {
                "NA".to_string()
            } else {
                format!("{:.3}", base * 2.0 + jitter)
            };
            vec![
                bilirubin,
                format!("{:.3}", 4.0 - base * 0.5 + jitter * 0.2),
                format!("{:.1}", 300.0 - base * 60.0 + jitter * 20.0),
                stage.to_string(),
            ]
        })
        .collect();
    RawTable::new(headers, rows)
}

fn quick_config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        id_column: None,
        artifact_path: dir.path().join("model.json").display().to_string(),
        report_path: Some(dir.path().join("report.html").display().to_string()),
        models: vec![
            ModelConfig::new(
                "Random Forest",
                ModelType::RandomForest {
                    n_estimators: 30,
                    max_depth: None,
                    min_samples_split: 2,
                    min_samples_leaf: 1,
                    bootstrap: true,
                    seed: 42,
                },
            ),
            ModelConfig::new(
                "Gradient Boosting",
                ModelType::GBDT {
                    learning_rate: 0.1,
                    max_depth: 3,
                    num_boost_round: 20,
                    training_optimization_level: 2,
                },
            ),
        ],
        ..PipelineConfig::default()
    }
}

#[test]
fn three_class_imbalanced_run() {
    let dir = TempDir::new().unwrap();
    let config = quick_config(&dir);
    let outcome = run_on_table(&stage_table(), &config).unwrap();

    assert_eq!(outcome.class_counts.values().copied().collect::<Vec<_>>(), [80, 15, 5]);
    assert!(outcome.resampled_counts.values().all(|&c| c == 80));
    assert_eq!(outcome.train_size + outcome.test_size, 240);
    assert_eq!(outcome.test_size, 48);

    assert_eq!(outcome.report.classes.len(), 3);
    assert!(outcome.roc_auc.is_none());

    let best_mean = outcome
        .cv_results
        .iter()
        .find(|r| r.name == outcome.best_model)
        .unwrap()
        .mean();
    assert!(outcome.cv_results.iter().all(|r| r.mean() <= best_mean));
    assert!(outcome.cv_results.iter().all(|r| r.scores.len() == 5));

    assert!(dir.path().join("model.json").exists());
    let html = std::fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("Model Selection"));
}

#[test]
fn persisted_bundle_predicts_training_labels() {
    let dir = TempDir::new().unwrap();
    let config = quick_config(&dir);
    run_on_table(&stage_table(), &config).unwrap();

    let bundle = ModelBundle::load(&config.artifact_path).unwrap();
    assert_eq!(bundle.feature_names(), ["bilirubin", "albumin", "platelets"]);

    let record: HashMap<String, FieldValue> = HashMap::from([
        ("bilirubin".to_string(), FieldValue::Missing),
        ("albumin".to_string(), FieldValue::Number(3.5)),
        ("platelets".to_string(), FieldValue::Number(240.0)),
        ("notes".to_string(), FieldValue::Text("ignored".into())),
    ]);
    assert_eq!(bundle.labels(), [1, 2, 3]);
    let stage = bundle.predict_record(&record).unwrap();
    assert!(bundle.labels().contains(&stage));

    let mut partial = record.clone();
    partial.remove("platelets");
    match bundle.predict_record(&partial) {
        Err(ClassifierError::ColumnMismatch { missing }) => assert_eq!(missing, ["platelets"]),
        other => panic!("expected a column mismatch, got {:?}", other.err()),
    }
}

#[cfg(target_os = "linux")]
#[test]
fn saving_to_a_full_device_fails() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        report_path: None,
        ..quick_config(&dir)
    };
    let outcome = run_on_table(&stage_table(), &config).unwrap();
    let err = outcome.bundle.save("/dev/full").unwrap_err();
    assert!(matches!(err, ClassifierError::Io { .. }), "{err}");
}

#[test]
fn bundle_with_other_format_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        report_path: None,
        ..quick_config(&dir)
    };
    run_on_table(&stage_table(), &config).unwrap();

    let text = std::fs::read_to_string(&config.artifact_path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    value["format_version"] = serde_json::json!(99);
    std::fs::write(&config.artifact_path, value.to_string()).unwrap();

    assert!(matches!(
        ModelBundle::load(&config.artifact_path),
        Err(ClassifierError::VersionMismatch { expected: 1, found: 99 })
    ));
}

#[test]
fn binary_problem_reports_roc_auc() {
    let headers = ["a", "b", "stage"].iter().map(|s| s.to_string()).collect();
    let rows = (0..60)
        .map(|i| {
            let stage = if i % 3 == 0 { "late" } else { "early" };
            let shift = if stage == "late" { 3.0 } else { 0.0 };
            let jitter = (i as f64 * 0.37).fract();
            vec![
                format!("{:.3}", shift + jitter),
                format!("{:.3}", jitter * 2.0),
                stage.to_string(),
            ]
        })
        .collect();
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        report_path: None,
        ..quick_config(&dir)
    };
    let outcome = run_on_table(&RawTable::new(headers, rows), &config).unwrap();

    let auc = outcome.roc_auc.expect("binary run has an AUC");
    assert!((0.0..=1.0).contains(&auc));
    let names: Vec<&str> = outcome.report.classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["early", "late"]);
}
