//! Bagged CART classification forest.
//!
//! Trees are grown on bootstrap samples with Gini impurity, considering
//! `sqrt(n_features)` randomly chosen features per split, and are trained in
//! parallel with rayon. Probabilities are the mean of the leaf class
//! distributions; importances are the mean decrease in impurity.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::error::{ClassifierError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::{argmax_labels, check_fit_input, index_classes, ClassifierModel};
use crate::models::registry::{Capabilities, RANDOM_FOREST};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn from_model_type(model_type: &ModelType) -> Option<Self> {
        match model_type {
            ModelType::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
                min_samples_leaf,
                bootstrap,
                seed,
            } => Some(ForestParams {
                n_estimators: (*n_estimators).max(1),
                max_depth: *max_depth,
                min_samples_split: (*min_samples_split).max(2),
                min_samples_leaf: (*min_samples_leaf).max(1),
                bootstrap: *bootstrap,
                seed: *seed,
            }),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
enum Node {
    Leaf {
        distribution: Vec<f32>,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_distribution(&self, row: &[f32]) -> &[f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Split {
    feature: usize,
    threshold: f32,
    decrease: f64,
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

struct TreeBuilder<'a> {
    x: &'a Array2<f32>,
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    params: &'a ForestParams,
    rng: StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn leaf(&mut self, counts: &[usize], n: usize) -> usize {
        let distribution = counts
            .iter()
            .map(|&c| if n == 0 { 0.0 } else { c as f32 / n as f32 })
            .collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let n = indices.len();
        let counts = self.counts(&indices);
        let impurity = gini(&counts, n);
        let depth_left = self.params.max_depth.map_or(true, |d| depth < d);

        if impurity <= 0.0 || n < self.params.min_samples_split || !depth_left {
            return self.leaf(&counts, n);
        }

        let Some(split) = self.best_split(&indices, &counts, impurity) else {
            return self.leaf(&counts, n);
        };
        self.importances[split.feature] += split.decrease;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[(i, split.feature)] <= split.threshold);

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, indices: &[usize], counts: &[usize], impurity: f64) -> Option<Split> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<Split> = None;
        for &feature in features.iter().take(self.max_features) {
            let mut sorted: Vec<(f32, usize)> = indices
                .iter()
                .map(|&i| (self.x[(i, feature)], self.y[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for k in 0..n - 1 {
                let (value, class) = sorted[k];
                left[class] += 1;
                right[class] -= 1;
                let next = sorted[k + 1].0;
                if next <= value {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let children =
                    n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right);
                let decrease = n as f64 * impurity - children;
                if best.map_or(true, |b| decrease > b.decrease + 1e-12) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        decrease,
                    });
                }
            }
        }
        best.filter(|b| b.decrease > 0.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RandomForestClassifier {
    params: ForestParams,
    classes: Vec<i32>,
    n_features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f32>,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        RandomForestClassifier {
            params,
            classes: Vec::new(),
            n_features: 0,
            trees: Vec::new(),
            importances: Vec::new(),
        }
    }

    fn check_fitted(&self, x: &Array2<f32>) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ClassifierError::NotFitted(self.name().to_string()));
        }
        if x.ncols() != self.n_features {
            return Err(ClassifierError::InvalidValue {
                column: "<features>".to_string(),
                value: format!("{} columns, expected {}", x.ncols(), self.n_features),
            });
        }
        Ok(())
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        check_fit_input(self.name(), x, y)?;
        let (classes, y_idx) = index_classes(y);
        let n = x.nrows();
        let n_features = x.ncols();
        let max_features = ((n_features as f64).sqrt() as usize).clamp(1, n_features.max(1));
        let params = &self.params;

        let grown: Vec<(DecisionTree, Vec<f64>)> = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(
                    params
                        .seed
                        .wrapping_add((t as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
                );
                let sample: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut builder = TreeBuilder {
                    x,
                    y: &y_idx,
                    n_classes: classes.len(),
                    max_features,
                    params,
                    rng,
                    nodes: Vec::new(),
                    importances: vec![0.0; n_features],
                };
                builder.build(sample, 0);
                (
                    DecisionTree {
                        nodes: builder.nodes,
                    },
                    builder.importances,
                )
            })
            .collect();

        let mut importances = vec![0f64; n_features];
        let mut trees = Vec::with_capacity(grown.len());
        for (tree, tree_imp) in grown {
            let total: f64 = tree_imp.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(tree_imp) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        let total: f64 = importances.iter().sum();
        self.importances = importances
            .into_iter()
            .map(|v| if total > 0.0 { (v / total) as f32 } else { 0.0 })
            .collect();
        self.trees = trees;
        self.classes = classes;
        self.n_features = n_features;

        log::debug!(
            "Random forest fitted: {} trees, {} classes, {} features",
            self.trees.len(),
            self.classes.len(),
            n_features
        );
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_labels(&proba, &self.classes))
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.check_fitted(x)?;
        let k = self.classes.len();
        let n_trees = self.trees.len() as f32;
        let mut out = Array2::from_elem((x.nrows(), k), 0f32);
        for r in 0..x.nrows() {
            let row = x.row_slice(r);
            let acc = out.row_slice_mut(r);
            for tree in &self.trees {
                for (a, p) in acc.iter_mut().zip(tree.leaf_distribution(row)) {
                    *a += p;
                }
            }
            for a in acc.iter_mut() {
                *a /= n_trees;
            }
        }
        Ok(out)
    }

    fn feature_importances(&self) -> Option<Vec<f32>> {
        if self.trees.is_empty() {
            None
        } else {
            Some(self.importances.clone())
        }
    }

    fn classes(&self) -> &[i32] {
        &self.classes
    }

    fn capabilities(&self) -> Capabilities {
        RANDOM_FOREST.capabilities
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Array2<f32>, Vec<i32>) {
        // feature 0 separates the classes, feature 1 is noise
        let mut x = Array2::with_columns(2);
        let mut y = Vec::new();
        for i in 0..30 {
            let class = (i % 3) as i32;
            x.push_row(&[class as f32 * 5.0 + (i as f32 * 0.01), (i * 7 % 11) as f32])
                .unwrap();
            y.push(class + 1);
        }
        (x, y)
    }

    fn small_forest() -> RandomForestClassifier {
        RandomForestClassifier::new(ForestParams {
            n_estimators: 25,
            ..ForestParams::default()
        })
    }

    #[test]
    fn learns_separable_classes() {
        let (x, y) = separable();
        let mut rf = small_forest();
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.classes(), &[1, 2, 3]);
        let pred = rf.predict(&x).unwrap();
        assert_eq!(pred, y);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = separable();
        let mut rf = small_forest();
        rf.fit(&x, &y).unwrap();
        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.shape(), (30, 3));
        for row in proba.rows() {
            let s: f32 = row.iter().sum();
            assert!((s - 1.0).abs() < 1e-4, "row sums to {s}");
        }
    }

    #[test]
    fn importances_favour_informative_feature() {
        let (x, y) = separable();
        let mut rf = small_forest();
        rf.fit(&x, &y).unwrap();
        let imp = rf.feature_importances().unwrap();
        assert!((imp.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!(imp[0] > imp[1], "{imp:?}");
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = separable();
        let mut a = small_forest();
        let mut b = small_forest();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn predict_before_fit_fails() {
        let (x, _) = separable();
        assert!(matches!(
            small_forest().predict(&x),
            Err(ClassifierError::NotFitted(_))
        ));
    }
}
