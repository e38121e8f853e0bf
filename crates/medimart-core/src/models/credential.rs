use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::models::{Meta, impl_document};
use crate::validation;

/// Account role. Each role owns its own profile collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patient,
    Doctor,
    Retailer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Retailer => "retailer",
            Role::Admin => "admin",
        }
    }

    /// Collection holding the role's profile, if it has one.
    pub fn profile_collection(&self) -> Option<Collection> {
        match self {
            Role::Patient => Some(Collection::Patients),
            Role::Doctor => Some(Collection::Doctors),
            Role::Retailer => Some(Collection::Retailers),
            Role::Admin => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "retailer" => Ok(Role::Retailer),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::invalid_field(
                "role",
                format!("'{other}' is not a role"),
            )),
        }
    }
}

/// Login secret for one account. Kept apart from profiles so the hash never
/// leaves the auth routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub subject_id: String,
    #[serde(default)]
    pub password_hash: String,
}

impl_document!(Credential, Collection::Credentials);

impl Credential {
    /// Emails are matched case-insensitively.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }

    pub fn validate(&self) -> Result<()> {
        validation::require_email("email", &self.email)?;
        validation::require("subjectId", &self.subject_id)?;
        validation::require("passwordHash", &self.password_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!("Doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert!("nurse".parse::<Role>().is_err());
        assert_eq!(Role::Retailer.to_string(), "retailer");
    }

    #[test]
    fn admin_has_no_profile() {
        assert_eq!(Role::Admin.profile_collection(), None);
        assert_eq!(Role::Patient.profile_collection(), Some(Collection::Patients));
    }

    #[test]
    fn email_normalised() {
        assert_eq!(Credential::normalize_email("  Asha@Mail.COM "), "asha@mail.com");
    }
}
