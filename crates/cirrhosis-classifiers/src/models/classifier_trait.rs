use crate::error::{ClassifierError, Result};
use crate::math::Array2;
use crate::models::registry::Capabilities;

/// Contract shared by every estimator in the candidate registry.
///
/// Labels are the encoded class integers produced by preprocessing; each
/// implementation keeps the sorted set of classes it saw in `fit` and
/// returns labels from that set.
pub trait ClassifierModel: Send + Sync {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()>;

    /// Predicted class label per row.
    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>>;

    /// Class probabilities, one column per entry of `classes()`.
    fn predict_proba(&self, _x: &Array2<f32>) -> Result<Array2<f32>> {
        Err(ClassifierError::Unsupported {
            model: self.name().to_string(),
            capability: "probability output",
        })
    }

    /// Normalised per-feature importance scores, when the model has them.
    fn feature_importances(&self) -> Option<Vec<f32>> {
        None
    }

    /// Sorted class labels seen during `fit`.
    fn classes(&self) -> &[i32];

    fn capabilities(&self) -> Capabilities;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Sorted, de-duplicated labels and each row's index into them.
pub(crate) fn index_classes(y: &[i32]) -> (Vec<i32>, Vec<usize>) {
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let idx = y
        .iter()
        .map(|label| classes.binary_search(label).unwrap_or(0))
        .collect();
    (classes, idx)
}

/// Row-wise argmax of a probability matrix mapped back to labels. The first
/// column wins ties.
pub(crate) fn argmax_labels(proba: &Array2<f32>, classes: &[i32]) -> Vec<i32> {
    proba
        .rows()
        .map(|row| {
            let mut best = 0;
            for (i, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = i;
                }
            }
            classes[best]
        })
        .collect()
}

pub(crate) fn check_fit_input(model: &str, x: &Array2<f32>, y: &[i32]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ClassifierError::LengthMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if x.is_empty() {
        return Err(ClassifierError::Fit {
            model: model.to_string(),
            reason: "no training rows".to_string(),
        });
    }
    Ok(())
}
