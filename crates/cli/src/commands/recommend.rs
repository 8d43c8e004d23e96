use serde::Serialize;
use spectrum_core::{EnrichedRecommendation, ProductInfo, RecommendError};

use crate::commands::{
    open_session, CommandResult, SessionOptions, EXIT_INVALID_REQUEST, EXIT_NOT_FOUND,
};

#[derive(Debug, Serialize)]
struct RecommendationPayload<'a> {
    product: &'a str,
    product_info: Option<&'a ProductInfo>,
    recommendations: Vec<EnrichedRecommendation>,
}

pub fn run(options: &SessionOptions, product: &str, count: Option<usize>) -> CommandResult {
    let (_, session) = match open_session("recommend", options) {
        Ok(opened) => opened,
        Err(failure) => return failure,
    };

    match session.recommend(product, count) {
        Ok(recommendations) => {
            let message = if recommendations.is_empty() {
                format!("no other products to compare with `{product}`")
            } else {
                format!("{} products similar to `{product}`", recommendations.len())
            };
            let payload = RecommendationPayload {
                product,
                product_info: session.product_info(product),
                recommendations,
            };
            CommandResult::success_with_data("recommend", message, &payload)
        }
        Err(error @ RecommendError::ProductNotFound { .. }) => {
            CommandResult::failure("recommend", "product_not_found", error.to_string(), EXIT_NOT_FOUND)
        }
        Err(error @ RecommendError::InvalidCount { .. }) => CommandResult::failure(
            "recommend",
            "invalid_request",
            error.to_string(),
            EXIT_INVALID_REQUEST,
        ),
    }
}
