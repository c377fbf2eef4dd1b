//! Held-out evaluation: accuracy, the per-class classification report,
//! binary ROC-AUC and feature-importance ranking.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fraction of positions where `y_pred` equals `y_true`. Empty input scores 0.
pub fn accuracy_score(y_true: &[i32], y_pred: &[i32]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassMetrics {
    pub label: i32,
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

/// Per-class precision, recall, F1 and support over the union of labels in
/// `y_true` and `y_pred`. Divisions by zero yield 0.
pub fn classification_report(y_true: &[i32], y_pred: &[i32]) -> ClassificationReport {
    classification_report_with_names(y_true, y_pred, |label| label.to_string())
}

/// As [`classification_report`], naming each row with `class_name`.
pub fn classification_report_with_names(
    y_true: &[i32],
    y_pred: &[i32],
    class_name: impl Fn(i32) -> String,
) -> ClassificationReport {
    let mut labels: Vec<i32> = y_true.iter().chain(y_pred.iter()).copied().collect();
    labels.sort_unstable();
    labels.dedup();

    let classes: Vec<ClassMetrics> = labels
        .iter()
        .map(|&label| {
            let mut tp = 0;
            let mut predicted = 0;
            let mut support = 0;
            for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                if p == label {
                    predicted += 1;
                }
                if t == label {
                    support += 1;
                    if p == label {
                        tp += 1;
                    }
                }
            }
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label,
                name: class_name(label),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let total: usize = classes.iter().map(|c| c.support).sum();
    let k = classes.len().max(1) as f64;
    let macro_avg = AverageMetrics {
        precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
        recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
        f1: classes.iter().map(|c| c.f1).sum::<f64>() / k,
        support: total,
    };
    let weight = |f: fn(&ClassMetrics) -> f64| {
        if total == 0 {
            0.0
        } else {
            classes
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        }
    };
    let weighted_avg = AverageMetrics {
        precision: weight(|c| c.precision),
        recall: weight(|c| c.recall),
        f1: weight(|c| c.f1),
        support: total,
    };

    ClassificationReport {
        accuracy: accuracy_score(y_true, y_pred),
        classes,
        macro_avg,
        weighted_avg,
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.name, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (label, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

/// Area under the ROC curve for `positive` vs. the rest, by the trapezoidal
/// rule over distinct score thresholds. `None` when only one class is
/// present in `y_true`.
pub fn roc_auc_score(y_true: &[i32], scores: &[f32], positive: i32) -> Option<f64> {
    let mut combined: Vec<(f32, bool)> = scores
        .iter()
        .copied()
        .zip(y_true.iter().map(|&y| y == positive))
        .collect();
    let total_pos = combined.iter().filter(|(_, p)| *p).count() as f64;
    let total_neg = combined.len() as f64 - total_pos;
    if total_pos == 0.0 || total_neg == 0.0 {
        return None;
    }

    // Descending score: each distinct threshold adds one ROC point.
    combined.sort_by(|a, b| b.0.total_cmp(&a.0));
    let mut auc = 0.0;
    let (mut tp, mut fp) = (0.0, 0.0);
    let (mut prev_tp, mut prev_fp) = (0.0, 0.0);
    let mut i = 0;
    while i < combined.len() {
        let score = combined[i].0;
        while i < combined.len() && combined[i].0 == score {
            if combined[i].1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        auc += (fp - prev_fp) * (tp + prev_tp) / 2.0;
        prev_tp = tp;
        prev_fp = fp;
    }
    Some(auc / (total_pos * total_neg))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f32,
}

/// The `n` most important features, descending; equal scores keep column
/// order.
pub fn top_importances(names: &[String], scores: &[f32], n: usize) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(scores.iter())
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_counts_matches() {
        assert_eq!(accuracy_score(&[1, 2, 3, 1], &[1, 2, 1, 1]), 0.75);
        assert_eq!(accuracy_score(&[], &[]), 0.0);
    }

    #[test]
    fn report_matches_hand_computed_values() {
        let y_true = [0, 0, 0, 1, 1, 2];
        let y_pred = [0, 0, 1, 1, 2, 2];
        let report = classification_report(&y_true, &y_pred);
        assert_eq!(report.classes.len(), 3);

        let c0 = &report.classes[0];
        assert_eq!((c0.precision, c0.support), (1.0, 3));
        assert!((c0.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((c0.f1 - 0.8).abs() < 1e-12);

        let c1 = &report.classes[1];
        assert_eq!((c1.precision, c1.recall), (0.5, 0.5));

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 6);
    }

    #[test]
    fn unpredicted_class_scores_zero() {
        let report = classification_report(&[0, 1], &[0, 0]);
        let c1 = &report.classes[1];
        assert_eq!((c1.precision, c1.recall, c1.f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn report_renders_one_row_per_class() {
        let report = classification_report_with_names(&[1, 2, 3], &[1, 2, 2], |l| format!("stage {l}"));
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("stage 3"));
        assert!(text.contains("weighted avg"));
        assert_eq!(text.lines().filter(|l| l.trim_start().starts_with("stage")).count(), 3);
    }

    #[test]
    fn auc_perfect_random_and_ties() {
        let y = [0, 0, 1, 1];
        assert_eq!(roc_auc_score(&y, &[0.1, 0.2, 0.8, 0.9], 1), Some(1.0));
        assert_eq!(roc_auc_score(&y, &[0.9, 0.8, 0.2, 0.1], 1), Some(0.0));
        assert_eq!(roc_auc_score(&y, &[0.5, 0.5, 0.5, 0.5], 1), Some(0.5));
        assert_eq!(roc_auc_score(&[1, 1], &[0.3, 0.4], 1), None);
    }

    #[test]
    fn top_importances_descending_and_truncated() {
        let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let top = top_importances(&names, &[0.1, 0.4, 0.1, 0.4], 3);
        let order: Vec<&str> = top.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, ["b", "d", "a"]);
    }
}
