pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ingest;
pub mod interactions;
pub mod recommend;
pub mod session;
pub mod telemetry;

pub use catalog::{ProductCatalog, ProductInfo};
pub use domain::customer::CustomerId;
pub use domain::product::ProductKey;
pub use domain::transaction::TransactionLine;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use interactions::{BuildReport, InteractionBuilder, InteractionData, InteractionMatrix};
pub use recommend::{
    CachePolicy, EnrichedRecommendation, NegativeQuantityPolicy, RecommendError,
    RecommendationResult, RecommenderOptions, SimilarityRecommender,
};
pub use session::AnalyticsSession;
