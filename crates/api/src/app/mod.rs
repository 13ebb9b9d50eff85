//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, reconciler and token issuer
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: query/response DTOs
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: JSON body extractor with API-shaped rejections

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use fieldops_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let jwt = Arc::new(fieldops_auth::Hs256JwtValidator::new(
        config.jwt_secret.clone().into_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(&config).await?);

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_str(&config.cors_origin)?)
        .allow_methods(Any)
        .allow_headers(Any);

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .nest("/auth", routes::auth::router())
        .merge(protected)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        ))
}
