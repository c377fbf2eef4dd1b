//! Small dense matrix type used throughout the crate.
//!
//! `Array2` is a row-major container with just the operations the pipeline
//! needs: row access, row selection and column extraction. Labels travel as
//! plain `Vec<i32>` alongside it.
pub mod matrix;

pub use matrix::{Array2, ShapeError};

/// Squared Euclidean distance between two rows.
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
