use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::services::matrix::InteractionMatrix;

/// Cosine similarity between two rating vectors.
///
/// A zero vector has no angle with anything; the 0/0 case is defined as 0.0
/// rather than NaN.
fn cosine(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let denom = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    a.dot(&b) / denom
}

/// Ranks every other user of the matrix by cosine similarity to the target,
/// descending. The target is excluded from its own ranking; an unknown
/// target yields an empty ranking.
///
/// Ties keep matrix row order (ascending user id): the sort is stable and
/// no secondary key is applied here.
pub fn user_similarities(matrix: &InteractionMatrix, user_id: i64) -> Vec<(i64, f64)> {
    let Some(target) = matrix.row(user_id) else {
        return Vec::new();
    };

    let mut scores: Vec<(i64, f64)> = matrix
        .user_ids()
        .iter()
        .enumerate()
        .filter(|(_, other_id)| **other_id != user_id)
        .map(|(row, other_id)| (*other_id, cosine(target, matrix.values().row(row))))
        .collect();

    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scores
}
