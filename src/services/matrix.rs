use std::collections::{BTreeSet, HashMap};

use ndarray::{Array2, ArrayView1};

use crate::models::Interaction;

/// Dense user×content rating matrix.
///
/// Rows are the distinct user ids observed in the interaction set, columns
/// the distinct content ids, both in ascending order. Cells without an
/// interaction hold 0.0, so every row vector spans the full column space.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    values: Array2<f64>,
    user_ids: Vec<i64>,
    content_ids: Vec<i64>,
    user_index: HashMap<i64, usize>,
    content_index: HashMap<i64, usize>,
}

impl InteractionMatrix {
    /// Builds the matrix from an interaction set.
    ///
    /// Duplicate (user, content) cells aggregate by arithmetic mean. The
    /// working set is normally deduplicated upstream, so this only matters
    /// when that step is skipped.
    pub fn from_interactions(interactions: &[Interaction]) -> Self {
        if interactions.is_empty() {
            return Self::empty();
        }

        let user_ids: Vec<i64> = interactions
            .iter()
            .map(|i| i.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let content_ids: Vec<i64> = interactions
            .iter()
            .map(|i| i.content_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_index: HashMap<i64, usize> =
            user_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let content_index: HashMap<i64, usize> =
            content_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut sums = Array2::<f64>::zeros((user_ids.len(), content_ids.len()));
        let mut counts = Array2::<f64>::zeros((user_ids.len(), content_ids.len()));

        for interaction in interactions {
            let row = user_index[&interaction.user_id];
            let col = content_index[&interaction.content_id];
            sums[[row, col]] += interaction.rating;
            counts[[row, col]] += 1.0;
        }

        let mut values = sums;
        for ((row, col), value) in values.indexed_iter_mut() {
            let count = counts[[row, col]];
            if count > 0.0 {
                *value /= count;
            }
        }

        Self {
            values,
            user_ids,
            content_ids,
            user_index,
            content_index,
        }
    }

    fn empty() -> Self {
        Self {
            values: Array2::zeros((0, 0)),
            user_ids: Vec::new(),
            content_ids: Vec::new(),
            user_index: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }

    pub fn contains_user(&self, user_id: i64) -> bool {
        self.user_index.contains_key(&user_id)
    }

    /// The rating vector of a user over the full column space, or `None`
    /// when the user has no row in the matrix.
    pub fn row(&self, user_id: i64) -> Option<ArrayView1<'_, f64>> {
        self.user_index.get(&user_id).map(|&row| self.values.row(row))
    }

    pub fn get(&self, user_id: i64, content_id: i64) -> Option<f64> {
        let row = *self.user_index.get(&user_id)?;
        let col = *self.content_index.get(&content_id)?;
        Some(self.values[[row, col]])
    }

    /// User ids in row order (ascending).
    pub fn user_ids(&self) -> &[i64] {
        &self.user_ids
    }

    /// Content ids in column order (ascending).
    pub fn content_ids(&self) -> &[i64] {
        &self.content_ids
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionKind;

    fn interaction(user_id: i64, content_id: i64, rating: f64) -> Interaction {
        Interaction::new(user_id, content_id, rating, InteractionKind::Rating)
    }

    #[test]
    fn test_empty_interactions_yield_empty_matrix() {
        let matrix = InteractionMatrix::from_interactions(&[]);
        assert!(matrix.is_empty());
        assert!(matrix.row(1).is_none());
        assert_eq!(matrix.user_ids().len(), 0);
    }

    #[test]
    fn test_matrix_is_rectangular_with_zero_fill() {
        let interactions = vec![
            interaction(1, 10, 5.0),
            interaction(2, 10, 3.0),
            interaction(2, 20, 4.0),
        ];
        let matrix = InteractionMatrix::from_interactions(&interactions);

        assert_eq!(matrix.user_ids(), &[1, 2]);
        assert_eq!(matrix.content_ids(), &[10, 20]);

        // User 1 never rated content 20; the cell is filled, not absent.
        assert_eq!(matrix.get(1, 10), Some(5.0));
        assert_eq!(matrix.get(1, 20), Some(0.0));
        assert_eq!(matrix.get(2, 10), Some(3.0));
        assert_eq!(matrix.get(2, 20), Some(4.0));

        // Every row spans the full column space.
        assert_eq!(matrix.row(1).unwrap().len(), 2);
        assert_eq!(matrix.row(2).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_cells_aggregate_by_mean() {
        let interactions = vec![
            interaction(1, 10, 2.0),
            interaction(1, 10, 4.0),
            interaction(1, 20, 5.0),
        ];
        let matrix = InteractionMatrix::from_interactions(&interactions);
        assert_eq!(matrix.get(1, 10), Some(3.0));
        assert_eq!(matrix.get(1, 20), Some(5.0));
    }

    #[test]
    fn test_unknown_ids_return_none() {
        let matrix = InteractionMatrix::from_interactions(&[interaction(1, 10, 5.0)]);
        assert!(matrix.row(99).is_none());
        assert_eq!(matrix.get(1, 99), None);
        assert_eq!(matrix.get(99, 10), None);
        assert!(!matrix.contains_user(99));
        assert!(matrix.contains_user(1));
    }

    #[test]
    fn test_ids_are_sorted_ascending() {
        let interactions = vec![
            interaction(5, 30, 1.0),
            interaction(2, 50, 2.0),
            interaction(9, 10, 3.0),
        ];
        let matrix = InteractionMatrix::from_interactions(&interactions);
        assert_eq!(matrix.user_ids(), &[2, 5, 9]);
        assert_eq!(matrix.content_ids(), &[10, 30, 50]);
    }
}
