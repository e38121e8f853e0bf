use thiserror::Error;

/// Core error types for MediMart domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid date or time: {0}")]
    InvalidDateTime(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    /// Create a new MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    /// Create a new InvalidField error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(value: impl Into<String>) -> Self {
        Self::InvalidDateTime(value.into())
    }

    /// Create a new InvalidTransition error
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Check if this error is a server error (5xx category)
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnknownCollection(_)
        )
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingField(_)
            | Self::InvalidField { .. }
            | Self::InvalidId(_)
            | Self::InvalidDateTime(_)
            | Self::TimeError(_) => ErrorCategory::Validation,
            Self::InvalidTransition { .. } => ErrorCategory::State,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::UnknownCollection(_) => ErrorCategory::System,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    State,
    Serialization,
    System,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::State => write!(f, "state"),
            Self::Serialization => write!(f, "serialization"),
            Self::System => write!(f, "system"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = CoreError::missing_field("doctorId");
        assert_eq!(err.to_string(), "Missing required field: doctorId");
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_invalid_field_message() {
        let err = CoreError::invalid_field("rating", "must be between 1 and 5");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'rating': must be between 1 and 5"
        );
    }

    #[test]
    fn test_invalid_transition() {
        let err = CoreError::invalid_transition("completed", "pending");
        assert_eq!(
            err.to_string(),
            "Invalid status transition: completed -> pending"
        );
        assert_eq!(err.category(), ErrorCategory::State);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid").unwrap_err();
        let core_err: CoreError = json_err.into();
        assert!(matches!(core_err, CoreError::JsonError(_)));
        assert_eq!(core_err.category(), ErrorCategory::Serialization);
    }

    #[test]
    fn test_server_errors() {
        assert!(CoreError::configuration("bad").is_server_error());
        assert!(CoreError::UnknownCollection("x".into()).is_server_error());
        assert!(!CoreError::invalid_id("x").is_server_error());
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::State.to_string(), "state");
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
        assert_eq!(ErrorCategory::System.to_string(), "system");
        assert_eq!(ErrorCategory::Configuration.to_string(), "configuration");
    }
}
