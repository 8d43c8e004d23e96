//! Similarity recommender implementation

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::similarity::{ColumnVectors, SimilarityMatrix};
use super::types::*;
use super::{RecommendResult, DEFAULT_RECOMMENDATION_COUNT};
use crate::interactions::InteractionMatrix;

/// Item-to-item recommender over a shared, immutable interaction matrix.
///
/// With [`CachePolicy::Precomputed`] the full similarity matrix is built on the first
/// query and reused afterwards. The matrix never changes after construction, so the
/// memoized scores cannot go stale.
#[derive(Debug)]
pub struct SimilarityRecommender {
    matrix: Arc<InteractionMatrix>,
    vectors: ColumnVectors,
    options: RecommenderOptions,
    precomputed: OnceLock<SimilarityMatrix>,
}

impl SimilarityRecommender {
    /// Create a recommender with default options
    pub fn new(matrix: Arc<InteractionMatrix>) -> Self {
        Self::with_options(matrix, RecommenderOptions::default())
    }

    pub fn with_options(matrix: Arc<InteractionMatrix>, options: RecommenderOptions) -> Self {
        let vectors = ColumnVectors::from_matrix(&matrix, options.negative_quantities);
        Self { matrix, vectors, options, precomputed: OnceLock::new() }
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn options(&self) -> RecommenderOptions {
        self.options
    }

    /// Whether the full similarity matrix has been computed yet.
    pub fn is_precomputed(&self) -> bool {
        self.precomputed.get().is_some()
    }

    /// Full product × product similarity matrix, computed once and memoized.
    pub fn similarity_matrix(&self) -> &SimilarityMatrix {
        self.precomputed.get_or_init(|| {
            debug!(
                event_name = "core.recommend.similarity_matrix_computed",
                products = self.vectors.len(),
                "full similarity matrix computed"
            );
            SimilarityMatrix::compute(&self.vectors)
        })
    }

    /// Cosine similarity between two products.
    pub fn similarity(&self, left: &str, right: &str) -> RecommendResult<f64> {
        let left = self.column_of(left)?;
        let right = self.column_of(right)?;
        Ok(self.scores_for(left)[right])
    }

    /// Up to `count` products most similar to `product`, best first.
    ///
    /// The queried product itself is never part of the result. Equal scores keep
    /// column order. An unknown product is an error; a known product with no other
    /// products to compare against gives an empty list.
    pub fn recommend(&self, product: &str, count: usize) -> RecommendResult<Vec<RecommendationResult>> {
        if count == 0 {
            return Err(RecommendError::InvalidCount { count });
        }
        let query = self.column_of(product)?;
        let scores = self.scores_for(query);

        let results: Vec<RecommendationResult> = rank_candidates(&scores, query, count)
            .into_iter()
            .filter_map(|(column, similarity_score)| {
                self.matrix.product_at(column).map(|key| RecommendationResult {
                    product: key.clone(),
                    similarity_score,
                    column_index: column,
                })
            })
            .collect();

        debug!(
            event_name = "core.recommend.query",
            product = product,
            requested = count,
            returned = results.len(),
            cache_policy = self.options.cache_policy.as_str(),
            "recommendations computed"
        );

        Ok(results)
    }

    /// Recommendations with the default count.
    pub fn recommend_default(&self, product: &str) -> RecommendResult<Vec<RecommendationResult>> {
        self.recommend(product, DEFAULT_RECOMMENDATION_COUNT)
    }

    fn column_of(&self, product: &str) -> RecommendResult<usize> {
        self.matrix
            .column_index(product)
            .ok_or_else(|| RecommendError::ProductNotFound { product: product.to_string() })
    }

    fn scores_for(&self, column: usize) -> Cow<'_, [f64]> {
        match self.options.cache_policy {
            CachePolicy::PerQuery => match self.precomputed.get() {
                Some(matrix) => Cow::Borrowed(matrix.row(column)),
                None => Cow::Owned(self.vectors.row(column)),
            },
            CachePolicy::Precomputed => Cow::Borrowed(self.similarity_matrix().row(column)),
        }
    }
}

/// Sorts every column except `query` by score descending and keeps the first `count`.
/// The sort is stable, so ties stay in ascending column order.
fn rank_candidates(scores: &[f64], query: usize, count: usize) -> Vec<(usize, f64)> {
    let mut candidates: Vec<(usize, f64)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(column, _)| *column != query)
        .collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(count);
    candidates
}
