//! Authentication for the MediMart server.
//!
//! - [`password`]: Argon2id hashing of account passwords
//! - [`jwt`]: HS256 access tokens
//! - [`extractors`]: `AuthUser` / `AdminUser` request extractors

pub mod error;
pub mod extractors;
pub mod jwt;
pub mod password;

pub use error::AuthError;
pub use extractors::{AdminUser, AuthUser};
pub use jwt::{Claims, JwtService, generate_secret};
pub use password::{check_password_strength, hash_password, verify_password};
