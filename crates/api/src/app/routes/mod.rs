use axum::{routing::get, Router};

pub mod auth;
pub mod clients;
pub mod interventions;
pub mod inventory;
pub mod reports;
pub mod statistics;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/clients", clients::router())
        .nest("/inventory", inventory::router())
        .nest("/interventions", interventions::router())
        .nest("/statistics", statistics::router())
        .nest("/reports", reports::router())
}
