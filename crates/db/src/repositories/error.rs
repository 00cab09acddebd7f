//! Repository error type.

use sea_orm::DbErr;
use tessera_core::execution::ExecutionError;

/// Errors raised while reading or writing ledger rows.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A stored row could not be converted back into a domain type.
    #[error("Corrupt row in {table}: {message}")]
    Corrupt {
        /// Table the row came from.
        table: &'static str,
        /// What failed to decode.
        message: String,
    },

    /// A domain value could not be serialized into a row.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    pub(crate) fn corrupt(table: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            table,
            message: message.to_string(),
        }
    }
}

impl From<RepositoryError> for ExecutionError {
    fn from(err: RepositoryError) -> Self {
        Self::Storage(err.to_string())
    }
}
