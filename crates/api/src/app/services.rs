use std::sync::Arc;

use fieldops_auth::{Hs256TokenIssuer, TokenIssuer};
use fieldops_infra::{AppConfig, InMemoryStore, InterventionReconciler, PostgresStore, Store, StoreError};
use fieldops_interventions::ReportOptions;

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub reconciler: InterventionReconciler,
    pub issuer: Arc<dyn TokenIssuer>,
    pub report: ReportOptions,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            reconciler: InterventionReconciler::new(Arc::clone(&store)),
            store,
            issuer,
            report: ReportOptions::default(),
        }
    }
}

/// Pick the storage backend from config and wire the services around it.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let store: Arc<dyn Store> = match &config.database {
        Some(db) => {
            tracing::info!(max_connections = db.max_connections, "using postgres store");
            Arc::new(PostgresStore::connect(&db.url, db.max_connections).await?)
        }
        None => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let issuer = Arc::new(Hs256TokenIssuer::new(
        config.jwt_secret.clone().into_bytes(),
        config.jwt_ttl(),
    ));

    Ok(AppServices::new(store, issuer))
}
