//! Core error types
//!
//! Every public core operation surfaces one of these kinds. Errors are local
//! to a single transaction; a failed operation leaves no partial effect.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transaction exceeded its time budget")]
    Timeout,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for CoreError {
    /// Postgres `query_canceled` (57014) is raised when a transaction blows
    /// its `statement_timeout` budget and is surfaced as a retryable kind.
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("57014") {
                return CoreError::Timeout;
            }
        }
        CoreError::Database(e)
    }
}

impl CoreError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Timeout)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retryable() {
        assert!(CoreError::Timeout.is_retryable());
        assert!(!CoreError::NotFound("order").is_retryable());
    }

    #[test]
    fn display_messages() {
        let e = CoreError::InvalidState("market is SUSPENDED".into());
        assert_eq!(e.to_string(), "invalid state: market is SUSPENDED");
    }
}
