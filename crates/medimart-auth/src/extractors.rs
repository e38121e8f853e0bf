//! Axum extractors for authenticated routes.
//!
//! # Example
//!
//! ```ignore
//! async fn stats(AdminUser(claims): AdminUser) -> Json<Value> {
//!     // only reached with a valid admin token
//! }
//! ```

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::jwt::{Claims, JwtService};

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::invalid_token("authorization header is not valid text"))?;
    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AuthError::invalid_token("expected 'Bearer <token>'"))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::invalid_token("expected 'Bearer <token>'"));
    }
    Ok(token.trim())
}

/// Any authenticated account.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt = Arc::<JwtService>::from_ref(state);
        let claims = jwt.verify(bearer_token(parts)?)?;
        Ok(Self(claims))
    }
}

/// An authenticated account with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<JwtService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            tracing::debug!(
                subject = %claims.sub,
                role = %claims.role,
                "Admin access denied: missing admin role"
            );
            return Err(AuthError::forbidden("Admin access required"));
        }
        Ok(Self(claims))
    }
}
