//! Process configuration, read from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `PORT` | `5000` |
//! | `JWT_SECRET` | `dev-secret` (warns) |
//! | `JWT_EXPIRES_IN_HOURS` | `168` |
//! | `CORS_ORIGIN` | `http://localhost:3000` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent |
//! | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `LOG_FORMAT` | `json` (`json` or `pretty`) |

use std::str::FromStr;

use thiserror::Error;

pub use fieldops_observability::LogFormat;

pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    pub cors_origin: String,
    /// `Some` selects the Postgres store.
    pub database: Option<DatabaseConfig>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in_hours: 168,
            cors_origin: "http://localhost:3000".to_string(),
            database: None,
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let use_persistent: bool = parse(&var, "USE_PERSISTENT_STORES")?.unwrap_or(false);
        let database = if use_persistent {
            Some(DatabaseConfig {
                url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
            })
        } else {
            None
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| defaults.jwt_secret.clone());

        let jwt_expires_in_hours: i64 =
            parse(&var, "JWT_EXPIRES_IN_HOURS")?.unwrap_or(defaults.jwt_expires_in_hours);
        if jwt_expires_in_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRES_IN_HOURS",
                value: jwt_expires_in_hours.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            port: parse(&var, "PORT")?.unwrap_or(defaults.port),
            jwt_secret,
            jwt_expires_in_hours,
            cors_origin: var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            database,
            log_format: parse(&var, "LOG_FORMAT")?.unwrap_or_default(),
        })
    }

    pub fn jwt_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt_expires_in_hours)
    }
}

fn parse<T, F>(var: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(config(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn persistent_mode_requires_database_url() {
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        );

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/fieldops"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(
            cfg.database,
            Some(DatabaseConfig {
                url: "postgres://localhost/fieldops".to_string(),
                max_connections: 4,
            })
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = config(&[("LOG_FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "LOG_FORMAT", .. }));

        let err = config(&[("JWT_EXPIRES_IN_HOURS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_EXPIRES_IN_HOURS", .. }));
    }

    #[test]
    fn pretty_logs_and_custom_port() {
        let cfg = config(&[("LOG_FORMAT", "pretty"), ("PORT", "8088")]).unwrap();
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.port, 8088);
    }
}
