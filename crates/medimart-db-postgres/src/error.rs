//! Error types for the PostgreSQL storage backend.

use medimart_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(e) => sqlx_to_storage(e),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Maps a driver error onto the storage error model.
pub fn sqlx_to_storage(err: SqlxError) -> StorageError {
    match &err {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::Tls(_) => {
            StorageError::connection_error(err.to_string())
        }
        e if has_pg_error_code(e, PG_UNDEFINED_TABLE) => StorageError::internal(
            "documents table is missing; run migrations before serving traffic",
        ),
        _ => StorageError::internal(err.to_string()),
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let storage_err: StorageError = PostgresError::config("test error").into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));

        let storage_err: StorageError = PostgresError::Database(SqlxError::PoolTimedOut).into();
        assert!(matches!(storage_err, StorageError::ConnectionError { .. }));
    }
}
