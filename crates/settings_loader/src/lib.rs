//! # Settings Loader
//!
//! Centralised settings loading for the expense export.
//!
//! Resolution order, later steps winning:
//!
//! 1. Built-in defaults ([`ExportSettings::default`]), which are the production constants
//! 2. A JSON settings file, named by `EXPORT_SETTINGS` or found at `export_settings.json`
//! 3. The environment overrides `ACCOUNTING_URL` and `EXPORT_ROOT`
//!
//! A `.env` file in the working directory is read first, so any of the variables above
//! may live there.
//!
//! ```rust,no_run
//! let settings = settings_loader::load_export_settings()?;
//! println!("fetching from {}", settings.endpoint);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::ExportSettings;

pub const SETTINGS_PATH_VAR: &str = "EXPORT_SETTINGS";
pub const ENDPOINT_VAR: &str = "ACCOUNTING_URL";
pub const EXPORT_ROOT_VAR: &str = "EXPORT_ROOT";
pub const DEFAULT_SETTINGS_FILE: &str = "export_settings.json";

/// Loads settings from a JSON file, missing keys keep their defaults
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<ExportSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: ExportSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from an explicit path, or from `export_settings.json` when it exists,
/// or falls back to the defaults.
///
/// An explicitly named file that cannot be read is an error; a missing default file is not.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Result<ExportSettings> {
    if let Some(settings_path) = path {
        return load_settings(settings_path);
    }

    if settings_file_exists(DEFAULT_SETTINGS_FILE) {
        return load_settings(DEFAULT_SETTINGS_FILE);
    }

    Ok(ExportSettings::default())
}

/// Applies `ACCOUNTING_URL` / `EXPORT_ROOT` on top of loaded settings
pub fn apply_overrides<F>(mut settings: ExportSettings, lookup: F) -> ExportSettings
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = lookup(ENDPOINT_VAR).filter(|v| !v.trim().is_empty()) {
        settings.endpoint = endpoint.trim().to_string();
    }
    if let Some(root) = lookup(EXPORT_ROOT_VAR).filter(|v| !v.trim().is_empty()) {
        settings.export_root = PathBuf::from(root.trim());
    }
    settings
}

/// Loads `.env`, the settings file and env overrides, in that order
pub fn load_export_settings() -> Result<ExportSettings> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let explicit = std::env::var(SETTINGS_PATH_VAR).ok().map(PathBuf::from);
    let settings = load_settings_with_fallback(explicit.as_ref())?;
    let settings = apply_overrides(settings, |key| std::env::var(key).ok());

    tracing::debug!(
        endpoint = %settings.endpoint,
        export_root = %settings.export_root.display(),
        start_month = %settings.start_month,
        "settings resolved"
    );
    Ok(settings)
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}
