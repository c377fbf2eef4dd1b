//! cirrhosis-classifiers: stage classification for tabular patient data.
//!
//! This crate provides the training side of the cirrhosis stage predictor:
//! CSV loading, median imputation and label encoding, SMOTE class balancing,
//! stratified splitting and k-fold cross-validation, a small registry of
//! estimators (random forest, GBDT, optional logistic regression behind the
//! `linfa` feature), evaluation metrics, an HTML report and the persisted
//! [`bundle::ModelBundle`] consumed by the prediction service.
//!
//! The design favors small, testable modules with feature flags so optional
//! estimator backends are only compiled when explicitly enabled.
pub mod bundle;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod math;
pub mod model_selection;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod resampling;

pub use error::{ClassifierError, Result};
