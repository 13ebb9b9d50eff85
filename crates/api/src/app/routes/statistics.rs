use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(overview))
        .route("/monthly-revenue", get(monthly_revenue))
        .route("/interventions-by-type", get(by_type))
}

pub async fn overview(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.statistics(Utc::now().date_naive()).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn monthly_revenue(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.monthly_revenue(Utc::now().date_naive()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn by_type(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.interventions_by_type().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
