//! Storage error types shared by every backend.

use std::fmt;

use medimart_core::Collection;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested document was not found.
    #[error("{collection} not found: {id}")]
    NotFound { collection: String, id: String },

    /// Attempted to insert a document whose id is taken.
    #[error("{collection} already exists: {id}")]
    AlreadyExists { collection: String, id: String },

    /// The document body is not acceptable to the store.
    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },

    /// A stored document could not be mapped to or from its model.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.label().to_string(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn already_exists(collection: Collection, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            collection: collection.label().to_string(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidDocument { .. } => ErrorCategory::Validation,
            Self::Serialization { .. } => ErrorCategory::Internal,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}

impl From<medimart_core::CoreError> for StorageError {
    fn from(e: medimart_core::CoreError) -> Self {
        Self::invalid_document(e.to_string())
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Validation,
    Infrastructure,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
