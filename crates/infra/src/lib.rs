//! Infrastructure layer: storage backends, the inventory reconciler and
//! process configuration.

pub mod config;
pub mod error;
pub mod reconciler;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig, LogFormat};
pub use error::StoreError;
pub use reconciler::{InterventionReconciler, ReconcileError};
pub use store::{memory::InMemoryStore, postgres::PostgresStore, Store, UnitOfWork};
