//! HS256 access tokens.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use medimart_core::models::Role;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AuthError;

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the profile document (or the admin credential).
    pub sub: String,
    pub role: Role,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Issues and verifies tokens with a shared secret.
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn new(secret: &str, issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str, role: Role, email: &str) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            iss: self.issuer.clone(),
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::encoding(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Random secret for development setups that did not configure one.
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test-secret-test-secret", "medimart-test", Duration::from_secs(3600))
    }

    #[test]
    fn issue_and_verify() {
        let svc = service();
        let token = svc.issue("p1", Role::Patient, "asha@mail.in").unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "p1");
        assert_eq!(claims.role, Role::Patient);
        assert_eq!(claims.iss, "medimart-test");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_admin());
    }

    #[test]
    fn rejects_other_secret() {
        let token = service().issue("p1", Role::Patient, "a@b.io").unwrap();
        let other = JwtService::new("another-secret", "medimart-test", Duration::from_secs(60));
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken { .. })));
    }

    #[test]
    fn rejects_other_issuer() {
        let token = service().issue("p1", Role::Patient, "a@b.io").unwrap();
        let other = JwtService::new("test-secret-test-secret", "someone-else", Duration::from_secs(60));
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn rejects_expired() {
        let svc = service();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: "d1".into(),
            role: Role::Doctor,
            email: "d@b.io".into(),
            iat: now - 7200,
            exp: now - 3600,
            iss: "medimart-test".into(),
        };
        let token = svc.encode(&claims).unwrap();
        assert!(matches!(svc.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn garbage_token() {
        assert!(service().verify("not.a.token").is_err());
    }

    #[test]
    fn generated_secrets_are_random() {
        let a = generate_secret();
        assert_eq!(a.len(), 48);
        assert_ne!(a, generate_secret());
    }
}
