use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use fieldops_core::InventoryItemId;
use fieldops_inventory::{InventoryItem, ItemDetails};

use crate::app::{dto, errors};
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::InventoryQuery>,
) -> axum::response::Response {
    match services.store.list_inventory(&query.into()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.low_stock_items().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<InventoryItemId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.get_inventory_item(id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(item)).into_response(),
        Ok(None) => errors::not_found("inventory item"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<ItemDetails>,
) -> axum::response::Response {
    let fields = match body.validate() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let item = InventoryItem::new(InventoryItemId::new(), fields, Utc::now());
    match services.store.insert_inventory_item(&item).await {
        Ok(()) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ItemDetails>,
) -> axum::response::Response {
    let id = match errors::parse_id::<InventoryItemId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let fields = match body.validate() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut item = match services.store.get_inventory_item(id).await {
        Ok(Some(i)) => i,
        Ok(None) => return errors::not_found("inventory item"),
        Err(e) => return errors::store_error_to_response(e),
    };
    item.apply(fields, Utc::now());

    match services.store.update_inventory_item(&item).await {
        Ok(()) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<InventoryItemId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.delete_inventory_item(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "inventory item deleted", "id": id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
