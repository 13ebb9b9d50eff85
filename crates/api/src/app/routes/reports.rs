use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;

use fieldops_core::InterventionId;
use fieldops_interventions::render_report;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/:id", get(intervention_report))
}

/// Printable report of one intervention, served as a text attachment.
pub async fn intervention_report(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<InterventionId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let detail = match services.store.intervention_detail(id).await {
        Ok(Some(d)) => d,
        Ok(None) => return errors::not_found("intervention"),
        Err(e) => return errors::store_error_to_response(e),
    };

    let body = render_report(&detail, Utc::now(), &services.report);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"intervention-report-{id}.txt\""),
            ),
        ],
        body,
    )
        .into_response()
}
