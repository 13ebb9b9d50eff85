use anyhow::Context;

use fieldops_infra::{config::DEV_JWT_SECRET, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` is optional.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("invalid configuration")?;
    fieldops_observability::init(config.log_format);

    if config.jwt_secret == DEV_JWT_SECRET {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let port = config.port;
    let app = fieldops_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind 0.0.0.0:{port}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
