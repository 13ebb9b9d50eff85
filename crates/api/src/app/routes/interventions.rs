use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use fieldops_core::InterventionId;
use fieldops_interventions::InterventionDraft;

use crate::app::{dto, errors};
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_interventions).post(create_intervention))
        .route(
            "/:id",
            get(get_intervention)
                .put(update_intervention)
                .delete(delete_intervention),
        )
}

pub async fn list_interventions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::InterventionQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.list_interventions(&filter).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_intervention(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<InterventionId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.intervention_detail(id).await {
        Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
        Ok(None) => errors::not_found("intervention"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_intervention(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<InterventionDraft>,
) -> axum::response::Response {
    match services.reconciler.create(body, Utc::now()).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

pub async fn update_intervention(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<InterventionDraft>,
) -> axum::response::Response {
    let id = match errors::parse_id::<InterventionId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.reconciler.update(id, body, Utc::now()).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

pub async fn delete_intervention(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<InterventionId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.reconciler.delete(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "intervention deleted", "id": id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}
