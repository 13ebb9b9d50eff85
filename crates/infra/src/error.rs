//! Storage errors.
//!
//! ## Postgres mapping
//!
//! | SQLx error | code | `StoreError` |
//! |---|---|---|
//! | Database (unique violation) | `23505` | `Constraint` |
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (check violation) | `23514` | `Constraint` |
//! | Database (other) | any | `Backend` |
//! | ColumnDecode / Decode / ColumnNotFound | n/a | `Decode` |
//! | RowNotFound | n/a | `NotFound` |
//! | PoolClosed, Io, Tls, ... | n/a | `Backend` |

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referential or uniqueness rule was violated (unknown client or
    /// inventory item, duplicate email, record still referenced).
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("not found")]
    NotFound,

    /// A stored row could not be mapped back to a domain value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Driver, pool or connection failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                // 22003: numeric_value_out_of_range (quantity overflow)
                Some("23505") | Some("23503") | Some("23514") | Some("22003") => {
                    StoreError::Constraint(msg)
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{operation}: {err}"))
        }
        _ => StoreError::Backend(format!("{operation}: {err}")),
    }
}
