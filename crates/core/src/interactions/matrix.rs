use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::customer::CustomerId;
use crate::domain::product::ProductKey;

/// One stored cell of a product column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Row index of the customer.
    pub row: usize,
    /// Net quantity the customer bought of the product. May be zero or negative.
    pub quantity: i64,
}

/// Sparse customer × product quantity matrix.
///
/// Products and customers are mapped to compact indices in lexicographic key order,
/// so column and row indices do not depend on the order of the input lines. Each
/// column stores its cells sorted by row. Cells that are not stored are zero.
///
/// The matrix is immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractionMatrix {
    products: Vec<ProductKey>,
    product_index: HashMap<String, usize>,
    customers: Vec<CustomerId>,
    customer_index: HashMap<String, usize>,
    columns: Vec<Vec<Cell>>,
}

impl InteractionMatrix {
    /// Builds the matrix from net quantities keyed by product, then customer.
    pub(crate) fn from_net_quantities(
        quantities: BTreeMap<ProductKey, BTreeMap<CustomerId, i64>>,
    ) -> Self {
        let customers: Vec<CustomerId> = quantities
            .values()
            .flat_map(|cells| cells.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let customer_index: HashMap<String, usize> = customers
            .iter()
            .enumerate()
            .map(|(row, customer)| (customer.0.clone(), row))
            .collect();

        let mut products = Vec::with_capacity(quantities.len());
        let mut columns = Vec::with_capacity(quantities.len());
        for (product, cells) in quantities {
            let column: Vec<Cell> = cells
                .into_iter()
                .filter_map(|(customer, quantity)| {
                    customer_index.get(customer.as_str()).map(|&row| Cell { row, quantity })
                })
                .collect();
            products.push(product);
            columns.push(column);
        }
        let product_index = products
            .iter()
            .enumerate()
            .map(|(column, product)| (product.0.clone(), column))
            .collect();

        Self { products, product_index, customers, customer_index, columns }
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Number of stored cells, explicit zeros included.
    pub fn cell_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Product keys in column order.
    pub fn products(&self) -> &[ProductKey] {
        &self.products
    }

    /// Customer ids in row order.
    pub fn customers(&self) -> &[CustomerId] {
        &self.customers
    }

    pub fn column_index(&self, product: &str) -> Option<usize> {
        self.product_index.get(product).copied()
    }

    pub fn row_index(&self, customer: &str) -> Option<usize> {
        self.customer_index.get(customer).copied()
    }

    pub fn contains_product(&self, product: &str) -> bool {
        self.product_index.contains_key(product)
    }

    pub fn product_at(&self, column: usize) -> Option<&ProductKey> {
        self.products.get(column)
    }

    /// Stored cells of a column, sorted by row. Empty for an out-of-range index.
    pub fn column(&self, column: usize) -> &[Cell] {
        self.columns.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Net quantity for a (customer, product) pair; zero when the pair was never seen.
    pub fn quantity(&self, customer: &str, product: &str) -> i64 {
        let (Some(row), Some(column)) = (self.row_index(customer), self.column_index(product))
        else {
            return 0;
        };

        self.columns[column]
            .binary_search_by_key(&row, |cell| cell.row)
            .map(|position| self.columns[column][position].quantity)
            .unwrap_or(0)
    }

    /// Dense column vector with one entry per customer.
    pub fn dense_column(&self, column: usize) -> Vec<i64> {
        let mut dense = vec![0; self.customers.len()];
        for cell in self.column(column) {
            dense[cell.row] = cell.quantity;
        }
        dense
    }
}
