//! Types for the similarity recommender

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ProductInfo;
use crate::config::ConfigError;
use crate::domain::product::ProductKey;

/// One ranked recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Recommended product
    pub product: ProductKey,
    /// Cosine similarity to the queried product, in [-1, 1]
    pub similarity_score: f64,
    /// Column of the product in the interaction matrix
    pub column_index: usize,
}

/// A recommendation joined with the recommended product's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecommendation {
    /// 1-based position in the ranked list
    pub rank: usize,
    pub product: ProductKey,
    pub similarity_score: f64,
    pub info: Option<ProductInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecommendError {
    /// The queried key is not a column of the interaction matrix.
    #[error("no such product: `{product}`")]
    ProductNotFound { product: String },
    #[error("recommendation count must be positive, got {count}")]
    InvalidCount { count: usize },
}

/// How similarity scores are obtained across queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Compute only the queried product's similarity row, on every query
    #[default]
    PerQuery,
    /// Compute the full product × product matrix on first use and reuse it
    Precomputed,
}

/// Treatment of negative net quantities (more returned than bought).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeQuantityPolicy {
    /// Use net quantities as stored
    #[default]
    Keep,
    /// Treat negative net quantities as zero
    Clamp,
}

/// Recommender settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecommenderOptions {
    pub cache_policy: CachePolicy,
    pub negative_quantities: NegativeQuantityPolicy,
}

impl CachePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerQuery => "per_query",
            Self::Precomputed => "precomputed",
        }
    }
}

impl NegativeQuantityPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Clamp => "clamp",
        }
    }
}

impl std::str::FromStr for CachePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_query" => Ok(Self::PerQuery),
            "precomputed" => Ok(Self::Precomputed),
            other => Err(ConfigError::Validation(format!(
                "unsupported cache policy `{other}` (expected per_query|precomputed)"
            ))),
        }
    }
}

impl std::str::FromStr for NegativeQuantityPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "clamp" => Ok(Self::Clamp),
            other => Err(ConfigError::Validation(format!(
                "unsupported negative quantity policy `{other}` (expected keep|clamp)"
            ))),
        }
    }
}
