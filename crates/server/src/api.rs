//! JSON API over a loaded [`AnalyticsSession`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use spectrum_core::{
    AnalyticsSession, ApplicationError, EnrichedRecommendation, InterfaceError, ProductInfo,
    RecommendError,
};
use tracing::warn;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct ApiState {
    session: Arc<AnalyticsSession>,
}

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopularityMetric {
    #[default]
    Revenue,
    Customers,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub by: PopularityMetric,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub product: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub product: String,
    pub count: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductListResponse {
    pub count: usize,
    pub products: Vec<ProductInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendationResponse {
    pub product: String,
    pub product_info: Option<ProductInfo>,
    pub recommendations: Vec<EnrichedRecommendation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

pub fn router(session: Arc<AnalyticsSession>) -> Router {
    Router::new()
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/popular", get(popular_products))
        .route("/api/v1/products/detail", get(product_detail))
        .route("/api/v1/recommendations", get(recommendations))
        .with_state(ApiState { session })
}

/// Products matching `search`, or the most popular products when no term is given.
pub async fn list_products(
    State(state): State<ApiState>,
    query: Result<Query<ProductsQuery>, QueryRejection>,
) -> Result<Json<ProductListResponse>, ApiFailure> {
    let query = query_params(query)?;
    let products: Vec<ProductInfo> =
        state.session.search(query.search.as_deref(), query.limit).into_iter().cloned().collect();
    Ok(Json(ProductListResponse { count: products.len(), products }))
}

pub async fn popular_products(
    State(state): State<ApiState>,
    query: Result<Query<PopularQuery>, QueryRejection>,
) -> Result<Json<ProductListResponse>, ApiFailure> {
    let query = query_params(query)?;
    let limit = query.limit.unwrap_or(state.session.settings().popular_limit);
    let catalog = state.session.catalog();
    let ranked = match query.by {
        PopularityMetric::Revenue => catalog.popular_by_revenue(limit),
        PopularityMetric::Customers => catalog.popular_by_customers(limit),
    };
    let products: Vec<ProductInfo> = ranked.into_iter().cloned().collect();
    Ok(Json(ProductListResponse { count: products.len(), products }))
}

pub async fn product_detail(
    State(state): State<ApiState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<ProductInfo>, ApiFailure> {
    let query = query_params(query)?;
    match state.session.product_info(&query.product) {
        Some(info) => Ok(Json(info.clone())),
        None => Err(failure(RecommendError::ProductNotFound { product: query.product }.into())),
    }
}

pub async fn recommendations(
    State(state): State<ApiState>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> Result<Json<RecommendationResponse>, ApiFailure> {
    let query = query_params(query)?;
    let recommendations = state
        .session
        .recommend(&query.product, query.count)
        .map_err(|error| failure(error.into()))?;

    Ok(Json(RecommendationResponse {
        product_info: state.session.product_info(&query.product).cloned(),
        product: query.product,
        recommendations,
    }))
}

/// Unwraps query parameters, reporting a malformed query string as a bad request.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiFailure> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| failure(ApplicationError::InvalidRequest(rejection.body_text())))
}

fn failure(error: ApplicationError) -> ApiFailure {
    let correlation_id = format!("req-{}", REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed));
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!(
        event_name = "server.api.request_failed",
        correlation_id = interface.correlation_id(),
        status = status.as_u16(),
        error = %interface,
        "api request failed"
    );

    let body = ApiError {
        error: interface.user_message().to_string(),
        detail: interface.to_string(),
        correlation_id: interface.correlation_id().to_string(),
    };
    (status, Json(body))
}
