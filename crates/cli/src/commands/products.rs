use spectrum_core::ProductInfo;

use crate::commands::{open_session, CommandResult, SessionOptions, EXIT_NOT_FOUND};
use crate::PopularityMetric;

pub fn search(options: &SessionOptions, term: Option<&str>, limit: Option<usize>) -> CommandResult {
    let (_, session) = match open_session("products", options) {
        Ok(opened) => opened,
        Err(failure) => return failure,
    };

    let products = session.search(term, limit);
    let message = match term.map(str::trim).filter(|term| !term.is_empty()) {
        Some(term) if products.is_empty() => format!("no products match `{term}`"),
        Some(term) => format!("{} products match `{term}`", products.len()),
        None => format!("{} most popular products", products.len()),
    };
    CommandResult::success_with_data("products", message, &products)
}

pub fn popular(
    options: &SessionOptions,
    limit: Option<usize>,
    metric: PopularityMetric,
) -> CommandResult {
    let (config, session) = match open_session("popular", options) {
        Ok(opened) => opened,
        Err(failure) => return failure,
    };

    let limit = limit.unwrap_or(config.recommendations.popular_limit);
    let products: Vec<&ProductInfo> = match metric {
        PopularityMetric::Revenue => session.catalog().popular_by_revenue(limit),
        PopularityMetric::Customers => session.catalog().popular_by_customers(limit),
    };
    let message = format!("top {} products by {}", products.len(), metric_name(metric));
    CommandResult::success_with_data("popular", message, &products)
}

pub fn info(options: &SessionOptions, product: &str) -> CommandResult {
    let (_, session) = match open_session("info", options) {
        Ok(opened) => opened,
        Err(failure) => return failure,
    };

    match session.product_info(product) {
        Some(info) => CommandResult::success_with_data("info", format!("statistics for `{product}`"), info),
        None => CommandResult::failure(
            "info",
            "product_not_found",
            format!("no such product: `{product}`"),
            EXIT_NOT_FOUND,
        ),
    }
}

fn metric_name(metric: PopularityMetric) -> &'static str {
    match metric {
        PopularityMetric::Revenue => "revenue",
        PopularityMetric::Customers => "customer count",
    }
}
