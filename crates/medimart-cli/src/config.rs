use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub format: Option<String>,
}

impl ProfileConfig {
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.format.as_deref().and_then(OutputFormat::parse)
    }
}

pub type ConfigFile = BTreeMap<String, ProfileConfig>;

pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".medimart");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn read_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

fn write_profile(path: &Path, profile: &str, config: &ProfileConfig) -> Result<()> {
    let mut all = read_file(path)?;
    all.insert(profile.to_string(), config.clone());
    fs::write(path, toml::to_string_pretty(&all)?)?;
    Ok(())
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    let mut all = read_file(&config_path()?)?;
    Ok(all.remove(profile).unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    write_profile(&config_path()?, profile, config)
}

/// Applies `medimart config set <key> <value>`.
pub fn set_key(config: &mut ProfileConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "server" => config.server = Some(value.trim_end_matches('/').to_string()),
        "format" => {
            if OutputFormat::parse(value).is_none() {
                anyhow::bail!("Unknown format: {value}. Valid formats: table, json");
            }
            config.format = Some(value.to_ascii_lowercase());
        }
        other => anyhow::bail!("Unknown config key: {other}. Valid keys: server, format"),
    }
    Ok(())
}

pub fn resolve_server(cli_server: &Option<String>, profile: &str) -> Result<String> {
    // 1. --server flag / MEDIMART_URL env
    if let Some(s) = cli_server {
        return Ok(s.trim_end_matches('/').to_string());
    }
    // 2. config.toml profile
    let cfg = load_profile(profile)?;
    if let Some(s) = cfg.server {
        return Ok(s);
    }
    // 3. Stored credentials for this profile
    if let Ok(Some(creds)) = crate::auth::load_credentials(profile) {
        return Ok(creds.server);
    }
    anyhow::bail!(
        "No server URL configured. Use --server, set MEDIMART_URL, or run: medimart config set server <url>"
    )
}
