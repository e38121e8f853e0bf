use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::config_dir;

/// Token issued by `POST /api/auth/login`, kept per profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    pub server: String,
    pub email: String,
    pub role: String,
    pub subject_id: String,
    pub token: String,
}

fn creds_path(profile: &str) -> Result<PathBuf> {
    Ok(config_dir()?.join(format!("credentials.{profile}.json")))
}

pub fn load_credentials(profile: &str) -> Result<Option<StoredCredentials>> {
    let path = creds_path(profile)?;
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let creds = serde_json::from_str(&content)
        .with_context(|| format!("Corrupt credentials file {}", path.display()))?;
    Ok(Some(creds))
}

pub fn save_credentials(profile: &str, creds: &StoredCredentials) -> Result<()> {
    let path = creds_path(profile)?;
    fs::write(path, serde_json::to_string_pretty(creds)?)?;
    Ok(())
}

pub fn remove_credentials(profile: &str) -> Result<bool> {
    let path = creds_path(profile)?;
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Falls back to the logged-in subject when no id was given.
pub fn subject_or(explicit: Option<&str>, creds: Option<&StoredCredentials>, what: &str) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }
    creds
        .map(|c| c.subject_id.clone())
        .with_context(|| format!("No {what} id given and not logged in. Pass --{what} or run: medimart login"))
}
