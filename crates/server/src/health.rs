use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use spectrum_core::AnalyticsSession;

#[derive(Clone)]
pub struct HealthState {
    session: Arc<AnalyticsSession>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub data: HealthCheck,
    pub checked_at: String,
}

pub fn router(session: Arc<AnalyticsSession>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { session })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let data = data_check(&state.session);
    let ready = data.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "spectrum-server runtime initialized".to_string(),
        },
        data,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn data_check(session: &AnalyticsSession) -> HealthCheck {
    let matrix = session.matrix();
    if matrix.is_empty() {
        return HealthCheck {
            status: "degraded",
            detail: format!(
                "no products loaded ({} transaction lines skipped)",
                session.report().skipped_lines()
            ),
        };
    }

    HealthCheck {
        status: "ready",
        detail: format!(
            "{} products across {} customers",
            matrix.product_count(),
            matrix.customer_count()
        ),
    }
}
