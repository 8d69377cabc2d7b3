//! Configuration module for Underfoot
//!
//! Handles loading settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Load settings from the first settings file found, falling back to defaults.
///
/// `UNDERFOOT_SETTINGS_PATH` takes precedence over the default search paths.
/// Environment overrides are applied in every case, and the merged settings
/// are validated before they are returned.
pub fn load() -> Result<Settings> {
    let settings = read()?;
    settings.validate()?;
    Ok(settings)
}

fn read() -> Result<Settings> {
    if let Ok(path) = std::env::var("UNDERFOOT_SETTINGS_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Loading settings from: {}", path.display());
            let mut settings = Settings::from_file(&path)?;
            settings.merge_env();
            return Ok(settings);
        }
    }

    for path in search_paths() {
        if path.exists() {
            info!("Loading settings from: {}", path.display());
            let mut settings = Settings::from_file(&path)?;
            settings.merge_env();
            return Ok(settings);
        }
    }

    info!("No settings file found, using defaults");
    let mut settings = Settings::default();
    settings.merge_env();
    Ok(settings)
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        PathBuf::from("/etc/underfoot/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("underfoot/settings.yml"));
    }
    paths
}
