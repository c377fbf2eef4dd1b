//! Stratified splitting, k-fold cross-validation and candidate selection.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::ModelConfig;
use crate::data_handling::{class_indices, LabeledData};
use crate::error::{ClassifierError, Result};
use crate::evaluation::accuracy_score;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::build_model;

/// Stratified, seeded train/test split. The test set takes
/// `ceil(test_size * n)` rows, allocated across classes by largest
/// remainder so every class keeps its share.
pub fn train_test_split(
    data: &LabeledData,
    test_size: f64,
    seed: u64,
) -> Result<(LabeledData, LabeledData)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ClassifierError::InvalidSplit(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n = data.len();
    // The epsilon keeps e.g. 0.2 * 100 from rounding up to 21.
    let n_test = (test_size * n as f64 - 1e-9).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ClassifierError::InvalidSplit(format!(
            "test_size {} leaves an empty split for {} samples",
            test_size, n
        )));
    }

    let groups = class_indices(&data.y);
    if let Some((&class, members)) = groups.iter().find(|(_, m)| m.len() < 2) {
        return Err(ClassifierError::InvalidSplit(format!(
            "class {} has {} member(s); stratified splitting needs at least 2",
            class,
            members.len()
        )));
    }

    // Largest-remainder allocation of test rows per class.
    let mut alloc: Vec<(usize, f64)> = groups
        .values()
        .map(|m| {
            let exact = m.len() as f64 * n_test as f64 / n as f64;
            (exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let mut remaining = n_test - alloc.iter().map(|a| a.0).sum::<usize>();
    let mut order: Vec<usize> = (0..alloc.len()).collect();
    order.sort_by(|&a, &b| alloc[b].1.total_cmp(&alloc[a].1).then(a.cmp(&b)));
    for &i in order.iter().cycle().take(order.len() * 2) {
        if remaining == 0 {
            break;
        }
        let size = groups.values().nth(i).map(Vec::len).unwrap_or(0);
        if alloc[i].0 + 1 < size {
            alloc[i].0 += 1;
            remaining -= 1;
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(n - n_test);
    let mut test_idx = Vec::with_capacity(n_test);
    for (members, (take, _)) in groups.values().zip(alloc.iter()) {
        let mut members = members.clone();
        members.shuffle(&mut rng);
        test_idx.extend_from_slice(&members[..*take]);
        train_idx.extend_from_slice(&members[*take..]);
    }
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Ok((data.select(&train_idx), data.select(&test_idx)))
}

/// Stratified k-fold splitter: each class's indices are dealt round-robin
/// over the folds, so every fold keeps the class proportions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        StratifiedKFold {
            n_splits: 5,
            shuffle: true,
            seed: 42,
        }
    }
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, shuffle: bool, seed: u64) -> Self {
        StratifiedKFold {
            n_splits,
            shuffle,
            seed,
        }
    }

    /// `(train, test)` index pairs, one per fold.
    pub fn split(&self, y: &[i32]) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(ClassifierError::InvalidSplit(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > y.len() {
            return Err(ClassifierError::InvalidSplit(format!(
                "cannot make {} folds from {} samples",
                self.n_splits,
                y.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold_of = vec![0usize; y.len()];
        let mut next = 0usize;
        for (class, mut members) in class_indices(y) {
            if members.len() < self.n_splits {
                log::warn!(
                    "Class {} has only {} members, fewer than n_splits={}",
                    class,
                    members.len(),
                    self.n_splits
                );
            }
            if self.shuffle {
                members.shuffle(&mut rng);
            }
            for idx in members {
                fold_of[idx] = next % self.n_splits;
                next += 1;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&i| fold_of[i] == fold);
                (train, test)
            })
            .collect())
    }
}

/// Per-fold accuracies of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvResult {
    pub name: String,
    pub scores: Vec<f64>,
}

impl CvResult {
    pub fn mean(&self) -> f64 {
        self.scores.iter().mean()
    }

    /// Population standard deviation of the fold scores.
    pub fn std(&self) -> f64 {
        self.scores.iter().population_std_dev()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{:<12} CV Accuracy: {:.3} ± {:.3}",
            self.name,
            self.mean(),
            self.std()
        )
    }
}

/// Fit a fresh estimator on every training fold and score accuracy on the
/// held-out fold. Folds run in parallel; scores are returned in fold order.
pub fn cross_val_score(
    config: &ModelConfig,
    data: &LabeledData,
    cv: &StratifiedKFold,
) -> Result<Vec<f64>> {
    let folds = cv.split(&data.y)?;
    folds
        .par_iter()
        .enumerate()
        .map(|(fold, (train_idx, test_idx))| {
            let train = data.select(train_idx);
            let test = data.select(test_idx);
            let mut model = build_model(config)?;
            model.fit(&train.x, &train.y)?;
            let pred = model.predict(&test.x)?;
            let acc = accuracy_score(&test.y, &pred);
            log::debug!("{} fold {}: accuracy {:.3}", config.name, fold, acc);
            Ok(acc)
        })
        .collect()
}

/// Cross-validate every candidate in order, printing one summary line each.
pub fn evaluate_candidates(
    candidates: &[ModelConfig],
    data: &LabeledData,
    cv: &StratifiedKFold,
) -> Result<Vec<CvResult>> {
    candidates
        .iter()
        .map(|candidate| {
            let scores = cross_val_score(candidate, data, cv)?;
            let result = CvResult {
                name: candidate.name.clone(),
                scores,
            };
            println!("{}", result.summary_line());
            Ok(result)
        })
        .collect()
}

/// Highest mean accuracy wins; the first candidate wins ties.
pub fn select_best(results: &[CvResult]) -> Option<&CvResult> {
    let mut best: Option<&CvResult> = None;
    for result in results {
        match best {
            Some(b) if result.mean() <= b.mean() => {}
            _ => best = Some(result),
        }
    }
    best
}
