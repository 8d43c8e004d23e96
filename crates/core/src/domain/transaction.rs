use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::product::ProductKey;

/// One line item of raw sales data.
///
/// `customer_id` and `product_description` are optional because the source data
/// carries rows without them; the interaction builder excludes such rows and counts
/// them in its report. `quantity` is signed: returns and cancellations show up as
/// negative or zero quantities and are summed as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub customer_id: Option<CustomerId>,
    pub product_description: Option<ProductKey>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub invoice_date: NaiveDateTime,
}

impl TransactionLine {
    /// Complete line with `total_amount = quantity * unit_price`.
    pub fn new(
        customer_id: impl Into<String>,
        product_description: impl Into<String>,
        quantity: i64,
        unit_price: Decimal,
        invoice_date: NaiveDateTime,
    ) -> Self {
        Self {
            customer_id: Some(CustomerId::new(customer_id)),
            product_description: Some(ProductKey::new(product_description)),
            quantity,
            unit_price,
            total_amount: unit_price * Decimal::from(quantity),
            invoice_date,
        }
    }

    pub fn with_total_amount(mut self, total_amount: Decimal) -> Self {
        self.total_amount = total_amount;
        self
    }

    /// Customer id, unless it is absent or blank.
    pub fn customer(&self) -> Option<&CustomerId> {
        self.customer_id.as_ref().filter(|id| !id.as_str().trim().is_empty())
    }

    /// Product key, unless it is absent or blank.
    pub fn product(&self) -> Option<&ProductKey> {
        self.product_description.as_ref().filter(|key| !key.as_str().trim().is_empty())
    }
}
