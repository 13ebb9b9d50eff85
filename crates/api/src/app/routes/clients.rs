use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use fieldops_clients::{Client, ClientDetails, ClientFilter};
use fieldops_core::ClientId;

use crate::app::{dto, errors};
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/:id", get(get_client).put(update_client).delete(delete_client))
}

pub async fn list_clients(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<ClientFilter>,
) -> axum::response::Response {
    match services.store.list_clients(&filter).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<ClientId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let client = match services.store.get_client(id).await {
        Ok(Some(c)) => c,
        Ok(None) => return errors::not_found("client"),
        Err(e) => return errors::store_error_to_response(e),
    };
    let interventions = match services.store.client_interventions(id).await {
        Ok(list) => list,
        Err(e) => return errors::store_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(dto::ClientWithInterventions {
            client,
            interventions,
        }),
    )
        .into_response()
}

pub async fn create_client(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<ClientDetails>,
) -> axum::response::Response {
    let fields = match body.validate() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let client = Client::new(ClientId::new(), fields, Utc::now());
    match services.store.insert_client(&client).await {
        Ok(()) => (StatusCode::CREATED, Json(client)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ClientDetails>,
) -> axum::response::Response {
    let id = match errors::parse_id::<ClientId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let fields = match body.validate() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut client = match services.store.get_client(id).await {
        Ok(Some(c)) => c,
        Ok(None) => return errors::not_found("client"),
        Err(e) => return errors::store_error_to_response(e),
    };
    client.apply(fields, Utc::now());

    match services.store.update_client(&client).await {
        Ok(()) => (StatusCode::OK, Json(client)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<ClientId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.delete_client(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "client deleted", "id": id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
