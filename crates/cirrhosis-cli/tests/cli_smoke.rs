//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `cirrhosis` binary to verify that
//! argument parsing, help text, and error handling work end-to-end.

use std::fmt::Write as _;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("cirrhosis").unwrap()
}

fn write_dataset(path: &std::path::Path) {
    let mut csv = String::from("patient_id,bilirubin,albumin,stage\n");
    for i in 0..60 {
        let stage = if i % 3 == 0 { 2 } else { 1 };
        let jitter = (i as f64 * 0.37).fract();
        let bilirubin = if i == 7 {
            "NA".to_string()
        } else {
            format!("{:.3}", stage as f64 * 2.0 + jitter)
        };
        writeln!(csv, "{},{},{:.3},{}", i, bilirubin, 4.0 - jitter, stage).unwrap();
    }
    std::fs::write(path, csv).unwrap();
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cirrhosis"));
}

// ---------------------------------------------------------------------------
// train
// ---------------------------------------------------------------------------

#[test]
fn train_without_config_prints_defaults_then_needs_data() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .arg("train")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"target_column\""))
        .stderr(predicate::str::contains("No config file provided"))
        .stderr(predicate::str::contains("File does not exist"));
}

#[test]
fn train_nonexistent_config_errors() {
    cmd()
        .args(["train", "/nonexistent/config.json"])
        .assert()
        .failure();
}

#[test]
fn train_rejects_wrong_extension() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.txt");
    std::fs::write(&data, "a,stage\n1,1\n").unwrap();
    cmd()
        .args(["train", "-d", data.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".tsv or .csv"));
}

#[test]
fn train_writes_bundle_and_config_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("pbc.csv");
    write_dataset(&data);
    let config = dir.path().join("config.json");
    std::fs::write(
        &config,
        r#"{
            "models": [
                {"name": "Random Forest", "RandomForest": {
                    "n_estimators": 15, "max_depth": null, "min_samples_split": 2,
                    "min_samples_leaf": 1, "bootstrap": true, "seed": 42}}
            ]
        }"#,
    )
    .unwrap();
    let model = dir.path().join("model.json");

    cmd()
        .args([
            "train",
            config.to_str().unwrap(),
            "-d",
            data.to_str().unwrap(),
            "-o",
            model.to_str().unwrap(),
            "--no-report",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("CV Accuracy"))
        .stdout(predicate::str::contains("Evaluating best: Random Forest"));

    assert!(model.exists());
    assert!(dir.path().join("model.config.json").exists());
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

#[test]
fn serve_requires_model() {
    cmd()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--model"));
}

#[test]
fn serve_missing_bundle_exits_with_error() {
    cmd()
        .args(["serve", "-m", "/nonexistent/model.json", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load model bundle"));
}
