use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};

use fieldops_auth::{hash_password, verify_password, Credentials, Registration, UserProfile};
use fieldops_core::{DomainError, UserId};

use crate::app::{dto, errors};
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<Registration>,
) -> axum::response::Response {
    let new_user = match body.validate() {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.find_user_by_email(&new_user.email).await {
        Ok(Some(_)) => {
            return errors::json_error(StatusCode::CONFLICT, "conflict", "email already registered");
        }
        Ok(None) => {}
        Err(e) => return errors::store_error_to_response(e),
    }

    // CPU-bound; runs on the blocking pool.
    let password = new_user.password.clone();
    let hashed = match tokio::task::spawn_blocking(move || hash_password(&password)).await {
        Ok(Ok(h)) => h,
        Ok(Err(e)) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string());
        }
        Err(e) => {
            tracing::error!(error = %e, "password hashing task failed");
            return internal_error();
        }
    };

    let now = Utc::now();
    let account = new_user.into_account(UserId::new(), hashed, now);
    if let Err(e) = services.store.insert_user(&account).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(user_id = %account.id, role = %account.role, "user registered");
    token_response(&services, StatusCode::CREATED, account.profile(), now)
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<Credentials>,
) -> axum::response::Response {
    let (email, password) = match body.validate() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let account = match services.store.find_user_by_email(&email).await {
        Ok(Some(a)) => a,
        Ok(None) => return errors::domain_error_to_response(DomainError::Unauthorized),
        Err(e) => return errors::store_error_to_response(e),
    };

    let hash = account.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false);
    if !verified {
        return errors::domain_error_to_response(DomainError::Unauthorized);
    }

    token_response(&services, StatusCode::OK, account.profile(), Utc::now())
}

fn token_response(
    services: &AppServices,
    status: StatusCode,
    user: UserProfile,
    now: DateTime<Utc>,
) -> axum::response::Response {
    match services.issuer.issue(&user, now) {
        Ok(token) => (status, Json(dto::AuthResponse { token, user })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to issue token");
            internal_error()
        }
    }
}

fn internal_error() -> axum::response::Response {
    errors::json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}
