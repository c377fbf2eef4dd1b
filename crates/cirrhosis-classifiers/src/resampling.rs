//! Synthetic minority oversampling (SMOTE).
//!
//! Every class below the majority count receives synthetic rows built by
//! interpolating between a random member and one of its nearest same-class
//! neighbours, until all classes have the majority count.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data_handling::{class_indices, LabeledData};
use crate::error::{ClassifierError, Result};
use crate::math::squared_distance;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Smote {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for Smote {
    fn default() -> Self {
        Smote {
            k_neighbors: 5,
            seed: 42,
        }
    }
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Smote { k_neighbors, seed }
    }

    /// Return the input rows followed by the synthetic rows.
    pub fn fit_resample(&self, data: &LabeledData) -> Result<LabeledData> {
        let groups = class_indices(&data.y);
        let Some(majority) = groups.values().map(Vec::len).max() else {
            return Ok(data.clone());
        };

        for (&class, members) in &groups {
            if members.len() < majority && members.len() < self.k_neighbors.max(1) {
                return Err(ClassifierError::InsufficientClassMembers {
                    class,
                    count: members.len(),
                    required: self.k_neighbors.max(1),
                });
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut x = data.x.clone();
        let mut y = data.y.clone();
        let ncols = data.x.ncols();

        for (&class, members) in &groups {
            let n_new = majority - members.len();
            if n_new == 0 {
                continue;
            }
            let neighbours = self.nearest_neighbours(data, members);
            let mut synthetic = vec![0f32; ncols];
            for _ in 0..n_new {
                let i = rng.gen_range(0..members.len());
                let base = data.x.row_slice(members[i]);
                let candidates = &neighbours[i];
                if candidates.is_empty() {
                    synthetic.copy_from_slice(base);
                } else {
                    let other = data.x.row_slice(candidates[rng.gen_range(0..candidates.len())]);
                    let gap: f32 = rng.gen();
                    for (c, value) in synthetic.iter_mut().enumerate() {
                        *value = base[c] + gap * (other[c] - base[c]);
                    }
                }
                x.push_row(&synthetic)?;
                y.push(class);
            }
            log::debug!(
                "SMOTE: class {} oversampled from {} to {}",
                class,
                members.len(),
                majority
            );
        }

        LabeledData::new(x, y, data.feature_names.clone())
    }

    /// For each member, the row indices of its `min(k, n - 1)` nearest
    /// same-class neighbours.
    fn nearest_neighbours(&self, data: &LabeledData, members: &[usize]) -> Vec<Vec<usize>> {
        let k = self.k_neighbors.min(members.len().saturating_sub(1));
        members
            .iter()
            .map(|&m| {
                let row = data.x.row_slice(m);
                let mut distances: Vec<(f32, usize)> = members
                    .iter()
                    .filter(|&&o| o != m)
                    .map(|&o| (squared_distance(row, data.x.row_slice(o)), o))
                    .collect();
                distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                distances.into_iter().take(k).map(|(_, o)| o).collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Array2;

    fn imbalanced(counts: &[(i32, usize)]) -> LabeledData {
        let mut x = Array2::with_columns(2);
        let mut y = Vec::new();
        for &(class, n) in counts {
            for i in 0..n {
                x.push_row(&[class as f32 * 10.0 + i as f32, i as f32]).unwrap();
                y.push(class);
            }
        }
        LabeledData::new(x, y, vec!["a".into(), "b".into()]).unwrap()
    }

    #[test]
    fn balances_all_classes() {
        let data = imbalanced(&[(0, 20), (1, 7), (2, 5)]);
        let out = Smote::default().fit_resample(&data).unwrap();
        let counts = out.class_counts();
        assert!(counts.values().all(|&c| c == 20), "{counts:?}");
        // originals come first, untouched
        assert_eq!(out.y[..data.len()], data.y[..]);
    }

    #[test]
    fn synthetic_rows_stay_within_class_hull() {
        let data = imbalanced(&[(0, 10), (1, 6)]);
        let out = Smote::default().fit_resample(&data).unwrap();
        for r in data.len()..out.len() {
            let row = out.x.row_slice(r);
            assert!(row[0] >= 10.0 && row[0] <= 15.0, "row {row:?}");
        }
    }

    #[test]
    fn too_few_members_fails() {
        let data = imbalanced(&[(0, 10), (1, 3)]);
        let err = Smote::default().fit_resample(&data).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::InsufficientClassMembers { class: 1, count: 3, required: 5 }
        ));
    }

    #[test]
    fn same_seed_same_output() {
        let data = imbalanced(&[(0, 12), (1, 6)]);
        let a = Smote::new(3, 7).fit_resample(&data).unwrap();
        let b = Smote::new(3, 7).fit_resample(&data).unwrap();
        assert_eq!(a.x, b.x);
    }
}
