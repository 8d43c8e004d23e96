//! Transaction loading from the retail sales CSV export.
//!
//! Expected columns: `CustomerID`, `Description`, `Quantity`, `UnitPrice`,
//! `TotalAmount`, `InvoiceDate`. Other columns are ignored. `TotalAmount` may be
//! absent, in which case it is derived from quantity and unit price.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::domain::customer::CustomerId;
use crate::domain::product::ProductKey;
use crate::domain::transaction::TransactionLine;

const DATE_TIME_FORMATS: &[&str] =
    &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not open transactions file `{path}`: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("malformed CSV at line {line}: {source}")]
    Csv { line: u64, source: csv::Error },
    #[error("invalid record at line {line}: {message}")]
    InvalidRecord { line: u64, message: String },
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    #[serde(rename = "CustomerID", default)]
    customer_id: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Quantity")]
    quantity: String,
    #[serde(rename = "UnitPrice")]
    unit_price: String,
    #[serde(rename = "TotalAmount", default)]
    total_amount: Option<String>,
    #[serde(rename = "InvoiceDate")]
    invoice_date: String,
}

pub fn load_transactions(path: &Path) -> Result<Vec<TransactionLine>, IngestError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| IngestError::Open { path: path.to_path_buf(), source })?;
    let lines = read_all(reader)?;

    info!(
        event_name = "core.ingest.loaded",
        path = %path.display(),
        lines = lines.len(),
        "transactions loaded"
    );
    Ok(lines)
}

pub fn load_transactions_from_reader<R: io::Read>(
    reader: R,
) -> Result<Vec<TransactionLine>, IngestError> {
    read_all(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader))
}

fn read_all<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<TransactionLine>, IngestError> {
    let headers = reader.headers().map_err(|source| IngestError::Csv { line: 1, source })?.clone();

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv {
            line: source.position().map(|position| position.line()).unwrap_or(0),
            source,
        })?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let raw: RawTransaction = record
            .deserialize(Some(&headers))
            .map_err(|source| IngestError::Csv { line, source })?;
        lines.push(
            into_transaction(raw).map_err(|message| IngestError::InvalidRecord { line, message })?,
        );
    }

    Ok(lines)
}

fn into_transaction(raw: RawTransaction) -> Result<TransactionLine, String> {
    let quantity = parse_quantity(&raw.quantity)?;
    let unit_price = parse_decimal("UnitPrice", &raw.unit_price)?;
    if unit_price.is_sign_negative() && !unit_price.is_zero() {
        return Err(format!("UnitPrice must not be negative, got `{}`", raw.unit_price));
    }
    let total_amount = match raw.total_amount.as_deref().filter(|value| !value.is_empty()) {
        Some(value) => parse_decimal("TotalAmount", value)?,
        None => unit_price * Decimal::from(quantity),
    };

    Ok(TransactionLine {
        customer_id: raw.customer_id.as_deref().and_then(normalize_customer_id),
        product_description: raw
            .description
            .filter(|value| !value.trim().is_empty())
            .map(ProductKey::from),
        quantity,
        unit_price,
        total_amount,
        invoice_date: parse_invoice_date(&raw.invoice_date)?,
    })
}

/// Ids exported from a float column come out as `17850.0`; keep the integer part.
fn normalize_customer_id(raw: &str) -> Option<CustomerId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = match trimmed.split_once('.') {
        Some((whole, fraction))
            if !whole.is_empty()
                && whole.chars().all(|ch| ch.is_ascii_digit())
                && fraction.chars().all(|ch| ch == '0') =>
        {
            whole
        }
        _ => trimmed,
    };
    Some(CustomerId::new(normalized))
}

fn parse_quantity(raw: &str) -> Result<i64, String> {
    if let Ok(quantity) = raw.parse::<i64>() {
        return Ok(quantity);
    }

    let decimal = parse_decimal("Quantity", raw)?;
    if !decimal.fract().is_zero() {
        return Err(format!("Quantity must be a whole number, got `{raw}`"));
    }
    decimal.to_i64().ok_or_else(|| format!("Quantity is out of range: `{raw}`"))
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| format!("{column} is not a number: `{raw}`"))
}

fn parse_invoice_date(raw: &str) -> Result<NaiveDateTime, String> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("InvoiceDate is not a recognised timestamp: `{raw}`"))
}
