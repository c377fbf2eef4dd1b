//! Feature/label containers and exploratory summaries.
//!
//! `LabeledData` is the feature matrix plus encoded label vector that flows
//! through resampling, splitting and cross-validation. `describe` produces
//! the per-column summary statistics printed before training.
use std::collections::BTreeMap;

use statrs::statistics::{Data, Distribution, Max, Min, OrderStatistics};

use crate::error::{ClassifierError, Result};
use crate::math::Array2;

#[derive(Debug, Clone)]
pub struct LabeledData {
    pub x: Array2<f32>,
    pub y: Vec<i32>,
    pub feature_names: Vec<String>,
}

impl LabeledData {
    pub fn new(x: Array2<f32>, y: Vec<i32>, feature_names: Vec<String>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ClassifierError::LengthMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        Ok(LabeledData {
            x,
            y,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> LabeledData {
        LabeledData {
            x: self.x.select_rows(indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    pub fn class_counts(&self) -> BTreeMap<i32, usize> {
        class_counts(&self.y)
    }

    pub fn log_input_data_summary(&self) {
        println!("----- Input Data Summary -----");
        println!(
            "Info: {} samples, {} feature columns",
            self.len(),
            self.x.ncols()
        );
        for (class, count) in self.class_counts() {
            println!("Info: class {} -> {} samples", class, count);
        }
        println!("-------------------------------");
    }
}

pub fn class_counts(y: &[i32]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for &label in y {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Indices of each class, classes in ascending order.
pub fn class_indices(y: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }
    groups
}

/// Summary statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summarise every column of `x`. Sample standard deviation is used, as in
/// the usual tabular `describe` output.
pub fn describe(x: &Array2<f32>, names: &[String]) -> Vec<ColumnSummary> {
    (0..x.ncols())
        .filter_map(|c| {
            let values: Vec<f64> = x
                .column(c)
                .into_iter()
                .filter(|v| !v.is_nan())
                .map(f64::from)
                .collect();
            if values.is_empty() {
                return None;
            }
            let count = values.len();
            let mut sorted = values.clone();
            sorted.sort_by(f64::total_cmp);
            let mut data = Data::new(values);
            Some(ColumnSummary {
                name: names.get(c).cloned().unwrap_or_else(|| format!("f{}", c)),
                count,
                mean: data.mean().unwrap_or(f64::NAN),
                std: if count > 1 {
                    data.std_dev().unwrap_or(f64::NAN)
                } else {
                    f64::NAN
                },
                min: data.min(),
                q25: linear_quantile(&sorted, 0.25),
                median: data.median(),
                q75: linear_quantile(&sorted, 0.75),
                max: data.max(),
            })
        })
        .collect()
}

/// Quantile of ascending `sorted` by linear interpolation between the two
/// closest ranks (position `q * (n - 1)`).
fn linear_quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

pub fn print_describe(summaries: &[ColumnSummary]) {
    println!(
        "{:<16} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for s in summaries {
        println!(
            "{:<16} {:>7} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            s.name, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
        );
    }
}
