//! Per-product statistics aggregated from the transaction set, and the lookups the
//! dashboard runs over them (search, popularity rankings, recommendation joins).

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductKey;
use crate::recommend::{EnrichedRecommendation, RecommendationResult};

/// Descriptive statistics for one product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product: ProductKey,
    /// Mean unit price across the product's lines
    pub avg_price: Decimal,
    /// Net units sold
    pub total_quantity: i64,
    /// Distinct customers that bought the product
    pub unique_customers: u32,
    /// Sum of line totals
    pub total_revenue: Decimal,
}

/// Read-only product statistics table, in the same order as the matrix columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductCatalog {
    entries: Vec<ProductInfo>,
    index: HashMap<String, usize>,
}

impl ProductCatalog {
    pub(crate) fn from_entries(entries: Vec<ProductInfo>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, info)| (info.product.0.clone(), position))
            .collect();
        Self { entries, index }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, product: &str) -> Option<&ProductInfo> {
        self.index.get(product).map(|&position| &self.entries[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductInfo> {
        self.entries.iter()
    }

    /// Case-insensitive substring search over product keys, in catalog order.
    pub fn search(&self, term: &str, limit: usize) -> Vec<&ProductInfo> {
        let needle = term.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|info| info.product.as_str().to_lowercase().contains(&needle))
            .take(limit)
            .collect()
    }

    /// Top products by total revenue. Equal revenue keeps catalog order.
    pub fn popular_by_revenue(&self, limit: usize) -> Vec<&ProductInfo> {
        self.top_by(limit, |a, b| b.total_revenue.cmp(&a.total_revenue))
    }

    /// Top products by distinct customer count. Equal counts keep catalog order.
    pub fn popular_by_customers(&self, limit: usize) -> Vec<&ProductInfo> {
        self.top_by(limit, |a, b| b.unique_customers.cmp(&a.unique_customers))
    }

    /// Joins a ranked recommendation list with product statistics.
    pub fn enrich(&self, results: Vec<RecommendationResult>) -> Vec<EnrichedRecommendation> {
        results
            .into_iter()
            .enumerate()
            .map(|(position, result)| EnrichedRecommendation {
                rank: position + 1,
                info: self.get(result.product.as_str()).cloned(),
                product: result.product,
                similarity_score: result.similarity_score,
            })
            .collect()
    }

    fn top_by(
        &self,
        limit: usize,
        compare: impl Fn(&ProductInfo, &ProductInfo) -> Ordering,
    ) -> Vec<&ProductInfo> {
        let mut ranked: Vec<&ProductInfo> = self.entries.iter().collect();
        ranked.sort_by(|a, b| compare(a, b));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ProductCatalog, ProductInfo};
    use crate::domain::product::ProductKey;
    use crate::recommend::RecommendationResult;

    fn info(product: &str, revenue: i64, customers: u32) -> ProductInfo {
        ProductInfo {
            product: ProductKey::new(product),
            avg_price: Decimal::new(250, 2),
            total_quantity: 10,
            unique_customers: customers,
            total_revenue: Decimal::from(revenue),
        }
    }

    fn catalog() -> ProductCatalog {
        ProductCatalog::from_entries(vec![
            info("JUMBO BAG RED RETROSPOT", 900, 12),
            info("LUNCH BAG RED RETROSPOT", 400, 30),
            info("PARTY BUNTING", 900, 5),
            info("REGENCY CAKESTAND 3 TIER", 1500, 8),
        ])
    }

    #[test]
    fn search_is_case_insensitive_and_limited() {
        let catalog = catalog();

        let hits = catalog.search("retrospot", 10);
        let names: Vec<_> = hits.iter().map(|info| info.product.as_str()).collect();
        assert_eq!(names, vec!["JUMBO BAG RED RETROSPOT", "LUNCH BAG RED RETROSPOT"]);

        assert_eq!(catalog.search("BAG", 1).len(), 1);
        assert!(catalog.search("teapot", 10).is_empty());
    }

    #[test]
    fn popular_by_revenue_breaks_ties_by_catalog_order() {
        let catalog = catalog();

        let names: Vec<_> =
            catalog.popular_by_revenue(3).iter().map(|info| info.product.as_str()).collect();
        assert_eq!(
            names,
            vec!["REGENCY CAKESTAND 3 TIER", "JUMBO BAG RED RETROSPOT", "PARTY BUNTING"]
        );
    }

    #[test]
    fn popular_by_customers_orders_by_reach() {
        let catalog = catalog();

        let top = catalog.popular_by_customers(1);
        assert_eq!(top[0].product.as_str(), "LUNCH BAG RED RETROSPOT");
    }

    #[test]
    fn enrich_assigns_ranks_and_joins_info() {
        let catalog = catalog();
        let results = vec![
            RecommendationResult {
                product: ProductKey::new("PARTY BUNTING"),
                similarity_score: 0.8,
                column_index: 2,
            },
            RecommendationResult {
                product: ProductKey::new("NOT IN CATALOG"),
                similarity_score: 0.1,
                column_index: 7,
            },
        ];

        let enriched = catalog.enrich(results);

        assert_eq!(enriched[0].rank, 1);
        assert_eq!(enriched[0].info.as_ref().map(|info| info.unique_customers), Some(5));
        assert_eq!(enriched[1].rank, 2);
        assert!(enriched[1].info.is_none());
    }
}
