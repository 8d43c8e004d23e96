//! Session-scoped analytics state.
//!
//! An [`AnalyticsSession`] is built once from the transaction set and then only read.
//! It owns the interaction matrix, the product catalog and the recommender, and is
//! passed explicitly to whatever presents the results.

use std::sync::Arc;

use tracing::info;

use crate::catalog::{ProductCatalog, ProductInfo};
use crate::config::{AppConfig, RecommendationConfig};
use crate::domain::transaction::TransactionLine;
use crate::errors::ApplicationError;
use crate::ingest::load_transactions;
use crate::interactions::{BuildReport, InteractionBuilder, InteractionMatrix};
use crate::recommend::{EnrichedRecommendation, RecommendResult, SimilarityRecommender};

#[derive(Debug)]
pub struct AnalyticsSession {
    matrix: Arc<InteractionMatrix>,
    catalog: Arc<ProductCatalog>,
    report: BuildReport,
    recommender: SimilarityRecommender,
    settings: RecommendationConfig,
}

impl AnalyticsSession {
    pub fn from_transactions(lines: &[TransactionLine], settings: RecommendationConfig) -> Self {
        let data = InteractionBuilder::new().build(lines);
        let matrix = Arc::new(data.matrix);
        let recommender =
            SimilarityRecommender::with_options(matrix.clone(), settings.recommender_options());

        Self { matrix, catalog: Arc::new(data.catalog), report: data.report, recommender, settings }
    }

    /// Reads the configured transactions file and builds the session from it.
    pub fn load(config: &AppConfig) -> Result<Self, ApplicationError> {
        let path = &config.data.transactions_path;
        let lines = load_transactions(path)
            .map_err(|error| ApplicationError::DataLoad(error.to_string()))?;
        let session = Self::from_transactions(&lines, config.recommendations.clone());

        info!(
            event_name = "core.session.ready",
            path = %path.display(),
            products = session.matrix.product_count(),
            customers = session.matrix.customer_count(),
            skipped_lines = session.report.skipped_lines(),
            "analytics session ready"
        );
        Ok(session)
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn report(&self) -> BuildReport {
        self.report
    }

    pub fn settings(&self) -> &RecommendationConfig {
        &self.settings
    }

    pub fn recommender(&self) -> &SimilarityRecommender {
        &self.recommender
    }

    /// Ranked recommendations for `product`, joined with product statistics.
    /// `None` uses the configured default count.
    pub fn recommend(
        &self,
        product: &str,
        count: Option<usize>,
    ) -> RecommendResult<Vec<EnrichedRecommendation>> {
        let count = count.unwrap_or(self.settings.default_count);
        let results = self.recommender.recommend(product, count)?;
        Ok(self.catalog.enrich(results))
    }

    /// Products whose key contains `term`. A blank term lists the most popular
    /// products instead.
    pub fn search(&self, term: Option<&str>, limit: Option<usize>) -> Vec<&ProductInfo> {
        let limit = limit.unwrap_or(self.settings.search_limit).min(self.settings.search_limit);
        match term.map(str::trim).filter(|term| !term.is_empty()) {
            Some(term) => self.catalog.search(term, limit),
            None => self.catalog.popular_by_revenue(limit.min(self.settings.popular_limit)),
        }
    }

    /// Top products by revenue.
    pub fn popular(&self, limit: Option<usize>) -> Vec<&ProductInfo> {
        self.catalog.popular_by_revenue(limit.unwrap_or(self.settings.popular_limit))
    }

    pub fn product_info(&self, product: &str) -> Option<&ProductInfo> {
        self.catalog.get(product)
    }
}
