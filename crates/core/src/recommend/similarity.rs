//! Cosine similarity over sparse product columns.
//!
//! Quantities are integers, so every dot product and squared norm is an exact sum in
//! `f64` for any realistic data size. That makes a score independent of which side
//! of the pair is scattered, so `score(a, b) == score(b, a)` holds bit for bit.
//! Norms are kept squared and the root is taken once per pair, which makes two
//! identical columns score exactly 1.0.

use crate::interactions::InteractionMatrix;

use super::types::NegativeQuantityPolicy;

/// Product columns converted to floating point, with precomputed squared norms.
#[derive(Debug, Clone)]
pub(crate) struct ColumnVectors {
    columns: Vec<Vec<(usize, f64)>>,
    squared_norms: Vec<f64>,
    rows: usize,
}

impl ColumnVectors {
    pub(crate) fn from_matrix(matrix: &InteractionMatrix, policy: NegativeQuantityPolicy) -> Self {
        let columns: Vec<Vec<(usize, f64)>> = (0..matrix.product_count())
            .map(|column| {
                matrix
                    .column(column)
                    .iter()
                    .map(|cell| {
                        let quantity = match policy {
                            NegativeQuantityPolicy::Keep => cell.quantity,
                            NegativeQuantityPolicy::Clamp => cell.quantity.max(0),
                        };
                        (cell.row, quantity as f64)
                    })
                    .filter(|(_, value)| *value != 0.0)
                    .collect()
            })
            .collect();
        let squared_norms = columns
            .iter()
            .map(|column| column.iter().map(|(_, value)| value * value).sum::<f64>())
            .collect();

        Self { columns, squared_norms, rows: matrix.customer_count() }
    }

    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }

    /// Similarity of `column` against every column, indexed by column.
    pub(crate) fn row(&self, column: usize) -> Vec<f64> {
        let mut scores = vec![0.0; self.columns.len()];
        let query_norm = self.squared_norms[column];
        if query_norm == 0.0 {
            return scores;
        }

        let mut dense = vec![0.0; self.rows];
        for &(row, value) in &self.columns[column] {
            dense[row] = value;
        }

        for (other, cells) in self.columns.iter().enumerate() {
            if other == column {
                scores[other] = 1.0;
                continue;
            }
            let dot: f64 = cells.iter().map(|&(row, value)| dense[row] * value).sum();
            scores[other] = cosine(dot, query_norm, self.squared_norms[other]);
        }

        scores
    }
}

/// Cosine from a dot product and the two squared norms. A zero norm yields zero.
pub(crate) fn cosine(dot: f64, left_squared_norm: f64, right_squared_norm: f64) -> f64 {
    if left_squared_norm == 0.0 || right_squared_norm == 0.0 {
        return 0.0;
    }
    (dot / (left_squared_norm * right_squared_norm).sqrt()).clamp(-1.0, 1.0)
}

/// Dense product × product similarity matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    pub(crate) fn compute(vectors: &ColumnVectors) -> Self {
        let size = vectors.len();
        let mut scores = Vec::with_capacity(size * size);
        for column in 0..size {
            scores.extend(vectors.row(column));
        }
        Self { size, scores }
    }

    /// Number of products on each side.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, left: usize, right: usize) -> Option<f64> {
        (left < self.size && right < self.size).then(|| self.scores[left * self.size + right])
    }

    pub fn row(&self, column: usize) -> &[f64] {
        if column >= self.size {
            return &[];
        }
        &self.scores[column * self.size..(column + 1) * self.size]
    }
}

#[cfg(test)]
mod tests {
    use super::cosine;

    #[test]
    fn zero_norm_yields_zero_instead_of_nan() {
        assert_eq!(cosine(0.0, 0.0, 9.0), 0.0);
        assert_eq!(cosine(0.0, 9.0, 0.0), 0.0);
    }

    #[test]
    fn result_is_clamped_to_unit_range() {
        assert_eq!(cosine(5.000_000_1, 5.0, 5.0), 1.0);
        assert_eq!(cosine(-5.000_000_1, 5.0, 5.0), -1.0);
    }

    #[test]
    fn identical_columns_score_exactly_one() {
        // [1, 2] against itself: 5 / sqrt(5 * 5)
        assert_eq!(cosine(5.0, 5.0, 5.0), 1.0);
        assert_eq!(cosine(14.0, 14.0, 14.0), 1.0);
    }
}
