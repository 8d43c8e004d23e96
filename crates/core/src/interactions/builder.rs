use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::matrix::InteractionMatrix;
use crate::catalog::{ProductCatalog, ProductInfo};
use crate::domain::customer::CustomerId;
use crate::domain::product::ProductKey;
use crate::domain::transaction::TransactionLine;

/// Counts of accepted and excluded transaction lines.
///
/// A line missing both identifiers is counted once, under `skipped_missing_customer`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub accepted_lines: usize,
    pub skipped_missing_customer: usize,
    pub skipped_missing_product: usize,
}

impl BuildReport {
    pub fn skipped_lines(&self) -> usize {
        self.skipped_missing_customer + self.skipped_missing_product
    }

    pub fn total_lines(&self) -> usize {
        self.accepted_lines + self.skipped_lines()
    }
}

/// Output of one build: the matrix, the per-product statistics and the line report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractionData {
    pub matrix: InteractionMatrix,
    pub catalog: ProductCatalog,
    pub report: BuildReport,
}

#[derive(Debug, Default)]
struct ProductTotals {
    price_sum: Decimal,
    line_count: u64,
    quantity: i64,
    revenue: Decimal,
}

#[derive(Clone, Debug, Default)]
pub struct InteractionBuilder;

impl InteractionBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Aggregates transaction lines into the interaction matrix and product catalog.
    ///
    /// Lines without a customer id or product key are excluded from the matrix and
    /// counted. Every other line contributes its quantity to its (customer, product)
    /// cell, returns included. Product statistics include every line that names a
    /// product, so a product bought only without a customer id has catalog
    /// statistics but no matrix column.
    pub fn build<'a, I>(&self, lines: I) -> InteractionData
    where
        I: IntoIterator<Item = &'a TransactionLine>,
    {
        let mut report = BuildReport::default();
        let mut quantities: BTreeMap<ProductKey, BTreeMap<CustomerId, i64>> = BTreeMap::new();
        let mut totals: BTreeMap<ProductKey, ProductTotals> = BTreeMap::new();

        for line in lines {
            // Statistics cover every line of a product, with or without a customer.
            if let Some(product) = line.product() {
                let entry = totals.entry(product.clone()).or_default();
                entry.price_sum += line.unit_price;
                entry.line_count += 1;
                entry.quantity = entry.quantity.saturating_add(line.quantity);
                entry.revenue += line.total_amount;
            }

            let Some(customer) = line.customer() else {
                report.skipped_missing_customer += 1;
                continue;
            };
            let Some(product) = line.product() else {
                report.skipped_missing_product += 1;
                continue;
            };
            report.accepted_lines += 1;

            let cell = quantities
                .entry(product.clone())
                .or_default()
                .entry(customer.clone())
                .or_insert(0);
            *cell = cell.saturating_add(line.quantity);
        }

        let entries = totals
            .into_iter()
            .map(|(product, totals)| {
                let unique_customers = quantities
                    .get(&product)
                    .map(|cells| u32::try_from(cells.len()).unwrap_or(u32::MAX))
                    .unwrap_or(0);
                ProductInfo {
                    avg_price: totals.price_sum / Decimal::from(totals.line_count),
                    total_quantity: totals.quantity,
                    unique_customers,
                    total_revenue: totals.revenue,
                    product,
                }
            })
            .collect();

        let matrix = InteractionMatrix::from_net_quantities(quantities);
        let catalog = ProductCatalog::from_entries(entries);

        if report.skipped_lines() > 0 {
            warn!(
                event_name = "core.interactions.lines_skipped",
                skipped_missing_customer = report.skipped_missing_customer,
                skipped_missing_product = report.skipped_missing_product,
                "transaction lines without customer or product were excluded"
            );
        }
        info!(
            event_name = "core.interactions.built",
            accepted_lines = report.accepted_lines,
            customers = matrix.customer_count(),
            products = matrix.product_count(),
            cells = matrix.cell_count(),
            "interaction matrix built"
        );

        InteractionData { matrix, catalog, report }
    }
}
