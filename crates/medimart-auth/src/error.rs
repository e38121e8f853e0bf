//! Authentication and authorization error types.

use axum::response::{IntoResponse, Response};
use medimart_api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Email, role or password did not match a stored credential.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No bearer token on a protected route.
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Token expired")]
    TokenExpired,

    /// The authenticated account may not perform the action.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Weak password: {message}")]
    WeakPassword { message: String },

    #[error("Password hashing failed: {message}")]
    Hashing { message: String },

    #[error("Token encoding failed: {message}")]
    Encoding { message: String },
}

impl AuthError {
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn weak_password(message: impl Into<String>) -> Self {
        Self::WeakPassword {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Returns `true` for errors that should be answered with 401.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::MissingToken | Self::InvalidToken { .. } | Self::TokenExpired
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::invalid_token(err.to_string()),
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::hashing(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match &err {
            e if e.is_unauthenticated() => ApiError::unauthorized(err.to_string()),
            AuthError::Forbidden { message } => ApiError::forbidden(message.clone()),
            AuthError::WeakPassword { message } => ApiError::bad_request(message.clone()),
            _ => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
