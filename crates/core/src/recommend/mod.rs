//! Product Recommendation Engine
//!
//! "Customers who bought X also bought Y": products are compared by the cosine
//! similarity of their per-customer purchase quantities.

mod engine;
mod similarity;
mod types;

pub use engine::SimilarityRecommender;
pub use similarity::SimilarityMatrix;
pub use types::*;

/// Result type for recommendation operations
pub type RecommendResult<T> = Result<T, RecommendError>;

/// Recommendations returned when the caller gives no count
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 5;
