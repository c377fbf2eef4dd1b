//! End-to-end training run: load, preprocess, summarise, balance, split,
//! cross-validate the candidates, refit the winner, evaluate, persist.
use std::collections::BTreeMap;
use std::time::Instant;

use maud::html;

use crate::bundle::ModelBundle;
use crate::config::PipelineConfig;
use crate::data_handling::{describe, print_describe, ColumnSummary, LabeledData};
use crate::error::{ClassifierError, Result};
use crate::evaluation::{
    classification_report_with_names, roc_auc_score, top_importances, ClassificationReport,
    FeatureImportance,
};
use crate::io::{read_table, RawTable};
use crate::model_selection::{evaluate_candidates, select_best, train_test_split, CvResult, StratifiedKFold};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::build_model;
use crate::models::registry::ModelRegistry;
use crate::preprocessing::Preprocessor;
use crate::report::plots::{plot_class_distribution, plot_feature_importances};
use crate::report::{Report, ReportSection};
use crate::resampling::Smote;

/// What a training run produced, besides the files it wrote.
pub struct PipelineOutcome {
    pub best_model: String,
    pub cv_results: Vec<CvResult>,
    pub class_counts: BTreeMap<i32, usize>,
    pub resampled_counts: BTreeMap<i32, usize>,
    pub train_size: usize,
    pub test_size: usize,
    pub report: ClassificationReport,
    pub roc_auc: Option<f64>,
    pub top_features: Vec<FeatureImportance>,
    pub bundle: ModelBundle,
}

/// Read `config.data_path` and run the whole pipeline on it.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
    let table = read_table(&config.data_path)?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.nrows(),
        table.ncols(),
        config.data_path
    );
    run_on_table(&table, config)
}

pub fn run_on_table(table: &RawTable, config: &PipelineConfig) -> Result<PipelineOutcome> {
    let start_time = Instant::now();

    let registry = ModelRegistry::from_configs(config.models.clone())?;

    let (preprocessor, data) =
        Preprocessor::fit(table, &config.target_column, config.id_column.as_deref())?;
    let class_name = |label: i32| preprocessor.target.class_name(label);

    // EDA
    data.log_input_data_summary();
    let summaries = describe(&data.x, &data.feature_names);
    print_describe(&summaries);
    let class_counts = data.class_counts();

    let balanced = if config.resample {
        let resampled = Smote::new(config.k_neighbors, config.seed).fit_resample(&data)?;
        log::info!(
            "Resampled {} rows to {} rows ({} synthetic)",
            data.len(),
            resampled.len(),
            resampled.len() - data.len()
        );
        resampled
    } else {
        data
    };
    let resampled_counts = balanced.class_counts();

    let (train, test) = train_test_split(&balanced, config.test_size, config.seed)?;
    log::info!("Train/test split: {} / {} rows", train.len(), test.len());

    let cv = StratifiedKFold::new(config.n_splits, config.shuffle, config.seed);
    let cv_results = evaluate_candidates(registry.candidates(), &train, &cv)?;
    let best = select_best(&cv_results).ok_or(ClassifierError::NoCandidates)?;
    let best_config = registry
        .get(&best.name)
        .ok_or(ClassifierError::NoCandidates)?;

    let mut model = build_model(best_config)?;
    model.fit(&train.x, &train.y)?;

    println!("\nEvaluating best: {}", best.name);
    let y_pred = model.predict(&test.x)?;
    let report = classification_report_with_names(&test.y, &y_pred, class_name);
    println!("{}", report);

    let roc_auc = binary_roc_auc(&model, &test)?;
    if let Some(auc) = roc_auc {
        println!("ROC AUC: {:.3}", auc);
    }

    let top_features = match model.feature_importances() {
        Some(scores) => {
            let top = top_importances(&train.feature_names, &scores, config.top_features);
            for (rank, f) in top.iter().enumerate() {
                log::info!("#{:<2} {:<16} {:.4}", rank + 1, f.feature, f.importance);
            }
            top
        }
        None => {
            log::info!("{} does not expose feature importances", best.name);
            Vec::new()
        }
    };

    let best_model = best.name.clone();
    let bundle = ModelBundle::new(best_model.clone(), preprocessor, model);
    bundle.save(&config.artifact_path)?;

    let outcome = PipelineOutcome {
        best_model,
        cv_results,
        class_counts,
        resampled_counts,
        train_size: train.len(),
        test_size: test.len(),
        report,
        roc_auc,
        top_features,
        bundle,
    };

    if let Some(path) = &config.report_path {
        build_report(&outcome, &summaries, config)?.save_to_file(path)?;
    }

    log::info!("Pipeline finished in {:?}", start_time.elapsed());
    Ok(outcome)
}

/// ROC-AUC on the positive (second) class, only for two-class problems
/// with probability output.
fn binary_roc_auc(model: &impl ClassifierModel, test: &LabeledData) -> Result<Option<f64>> {
    let classes = model.classes();
    if classes.len() != 2 || !model.capabilities().probabilities {
        return Ok(None);
    }
    let proba = model.predict_proba(&test.x)?;
    Ok(roc_auc_score(&test.y, &proba.column(1), classes[1]))
}

fn build_report(
    outcome: &PipelineOutcome,
    summaries: &[ColumnSummary],
    config: &PipelineConfig,
) -> Result<Report> {
    let target = &outcome.bundle.preprocessor.target;
    let class_name = |label: i32| target.class_name(label);
    let mut report = Report::new(
        "cirrhosis",
        env!("CARGO_PKG_VERSION"),
        None,
        "Cirrhosis Stage Classification Report",
    );

    /* Section 1: Data */
    {
        let mut section = ReportSection::new("Data");
        section.add_content(html! {
            p { "Summary statistics of the feature columns after imputation." }
            table {
                tr { th { "column" } th { "count" } th { "mean" } th { "std" } th { "min" }
                     th { "25%" } th { "50%" } th { "75%" } th { "max" } }
                @for s in summaries {
                    tr {
                        td { (s.name) } td { (s.count) }
                        td { (format!("{:.3}", s.mean)) } td { (format!("{:.3}", s.std)) }
                        td { (format!("{:.3}", s.min)) } td { (format!("{:.3}", s.q25)) }
                        td { (format!("{:.3}", s.median)) } td { (format!("{:.3}", s.q75)) }
                        td { (format!("{:.3}", s.max)) }
                    }
                }
            }
        });
        section.add_plot(plot_class_distribution(
            &outcome.class_counts,
            class_name,
            "Stage Class Distribution",
        ));
        if config.resample {
            section.add_plot(plot_class_distribution(
                &outcome.resampled_counts,
                class_name,
                "Stage Class Distribution After Resampling",
            ));
        }
        report.add_section(section);
    }

    /* Section 2: Model selection */
    {
        let mut section = ReportSection::new("Model Selection");
        section.add_content(html! {
            p { (config.n_splits) "-fold stratified cross-validation on "
                (outcome.train_size) " training rows." }
            pre {
                @for r in &outcome.cv_results { (r.summary_line()) "\n" }
            }
            p { "Selected: " strong { (outcome.best_model) } }
        });
        report.add_section(section);
    }

    /* Section 3: Evaluation */
    {
        let mut section = ReportSection::new("Evaluation");
        section.add_content(html! {
            p { "Held-out test set of " (outcome.test_size) " rows." }
            pre { (outcome.report.to_string()) }
            @if let Some(auc) = outcome.roc_auc {
                p { "ROC AUC: " (format!("{:.3}", auc)) }
            }
        });
        if !outcome.top_features.is_empty() {
            section.add_plot(plot_feature_importances(
                &outcome.top_features,
                &format!("Top {} Feature Importances", outcome.top_features.len()),
            ));
        }
        report.add_section(section);
    }

    /* Section 4: Configuration */
    {
        let config_json = serde_json::to_string_pretty(config)?;
        let mut section = ReportSection::new("Configuration");
        section.add_content(html! {
            pre { code { (config_json) } }
        });
        report.add_section(section);
    }

    Ok(report)
}
