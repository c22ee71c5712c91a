//! Configuration file discovery and loading.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::utils::private_path;

/// Custom configuration directory from `--config`, set once at startup.
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

pub const CONFIG_FILE_NAME: &str = "salatr.toml";

/// Set the configuration directory for the current process.
/// Returns an error if already set.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// The custom configuration directory, if one was set.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Path of `salatr.toml`, whether or not it exists yet.
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("salatr").join(CONFIG_FILE_NAME))
}

/// Load the configuration, writing a default file first if none exists.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
    }

    load_from_path(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            private_path(&config_path)
        )
    })
}

/// Load and validate the configuration at `path` without creating it.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))?;

    validate_config(&config)?;
    apply_modifications(&mut config);

    Ok(config)
}

/// Normalize values that are valid but stored loosely.
fn apply_modifications(config: &mut Config) {
    if let Some(tz) = &config.timezone {
        let trimmed = tz.trim();
        if trimmed.is_empty() {
            config.timezone = None;
        } else if trimmed != tz {
            config.timezone = Some(trimmed.to_string());
        }
    }

    if let Some(city) = &config.city
        && city.trim().is_empty()
    {
        config.city = None;
    }
}
