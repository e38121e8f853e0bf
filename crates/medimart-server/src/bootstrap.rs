//! Startup provisioning.
//!
//! Creates the configured admin account on first start. An existing account
//! with the same email is left untouched, so changing the password in the
//! config file does not overwrite a password set later.

use medimart_auth::hash_password;
use medimart_core::generate_id;
use medimart_core::models::{Credential, Meta, Role};
use medimart_storage::{DocumentStorage, FindQuery, Repository};
use tracing::{info, warn};

use crate::config::AdminUserConfig;

/// Returns `true` when a new admin credential was written.
pub async fn bootstrap_admin_user(
    storage: &dyn DocumentStorage,
    admin: &AdminUserConfig,
) -> anyhow::Result<bool> {
    let email = Credential::normalize_email(&admin.email);
    let repo = Repository::<Credential>::new(storage);

    let query = FindQuery::new()
        .eq("email", email.as_str())
        .eq("role", Role::Admin.as_str());
    if repo.find_one(&query).await?.is_some() {
        info!(email = %email, "admin user already exists");
        return Ok(false);
    }

    if admin.password.chars().count() < medimart_auth::password::MIN_PASSWORD_LEN {
        warn!("bootstrap admin password is shorter than the minimum allowed for registration");
    }

    // Admins have no profile document; the credential is its own subject.
    let id = generate_id();
    let credential = Credential {
        meta: Meta::with_id(id.clone()),
        email: email.clone(),
        role: Role::Admin,
        subject_id: id,
        password_hash: hash_password(&admin.password)?,
    };
    credential.validate()?;
    repo.create(&credential).await?;

    info!(email = %email, "bootstrap admin user created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimart_db_memory::InMemoryStorage;

    #[tokio::test]
    async fn creates_admin_once() {
        let storage = InMemoryStorage::new();
        let admin = AdminUserConfig {
            email: "Admin@MediMart.in".into(),
            password: "change-me-now".into(),
        };
        assert!(bootstrap_admin_user(&storage, &admin).await.unwrap());
        assert!(!bootstrap_admin_user(&storage, &admin).await.unwrap());

        let creds = Repository::<Credential>::new(&storage)
            .find(&FindQuery::new())
            .await
            .unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].email, "admin@medimart.in");
        assert_eq!(creds[0].subject_id, creds[0].meta.id);
        assert!(medimart_auth::verify_password("change-me-now", &creds[0].password_hash).unwrap());
    }
}
