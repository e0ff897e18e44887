//! # Settings Loader
//!
//! This crate provides centralized settings loading functionality for the venue
//! metrics tooling. It handles loading configuration from JSON files, particularly
//! the main `settings.json` file that selects the venue label, the precomputed
//! cache scopes and the reconciliation tolerance.
//!
//! ## Features
//!
//! - Load settings from specified file paths
//! - Load settings from default location (`settings.json`)
//! - Handle optional settings gracefully
//! - Provide fallback mechanisms when settings files are missing
//! - Validation and error handling for malformed settings files
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/my_settings.json")?;
//!
//! // Load from default location
//! let settings = settings_loader::load_default_settings()?;
//!
//! // Load optional settings (returns None if file doesn't exist)
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_optional_settings(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::ReportSettings;

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<ReportSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: ReportSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from a default location (settings.json in the current directory)
pub fn load_default_settings() -> Result<ReportSettings> {
    load_settings("settings.json")
}

/// Loads settings from an optional path, returning None if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<ReportSettings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// Tries to load settings from the provided path, falling back to the default
/// location if the path is None or if the file doesn't exist. Returns None only
/// if no settings file is found anywhere.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Result<Option<ReportSettings>> {
    // First try the provided path
    if let Some(settings_path) = path {
        if let Ok(settings) = load_settings(settings_path) {
            return Ok(Some(settings));
        }
    }

    // Try default location
    match load_default_settings() {
        Ok(settings) => Ok(Some(settings)),
        Err(_) => Ok(None), // No settings file found, return None
    }
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

/// Checks if the default settings file (settings.json) exists
pub fn default_settings_exist() -> bool {
    settings_file_exists("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{CategoryKey, TimeRangeKey};
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("venue-metrics-{}-{name}", std::process::id()))
    }

    #[test]
    fn loads_a_full_settings_file() {
        let path = temp_path("full.json");
        fs::write(
            &path,
            r#"{
                "venue": "Kings Lounge",
                "time_ranges": ["ALL", "3"],
                "categories": ["ALL", "SERIES"],
                "cache_path": "cache/metrics.json",
                "currency_epsilon": 0.05
            }"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(settings.venue, "Kings Lounge");
        assert_eq!(settings.time_ranges, vec![TimeRangeKey::All, TimeRangeKey::ThreeMonths]);
        assert_eq!(settings.categories, vec![CategoryKey::All, CategoryKey::Series]);
        assert_eq!(settings.currency_epsilon, Some(0.05));
        assert_eq!(settings.global_scopes().len(), 4);
    }

    #[test]
    fn absent_fields_fall_back_to_defaults() {
        let path = temp_path("sparse.json");
        fs::write(&path, r#"{ "venue": "Side Room" }"#).unwrap();

        let settings = load_settings(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(settings.venue, "Side Room");
        assert_eq!(settings.time_ranges.len(), 5);
        assert_eq!(settings.categories.len(), 3);
        assert_eq!(settings.currency_epsilon, None);
    }

    #[test]
    fn malformed_json_is_an_error_naming_the_file() {
        let path = temp_path("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_settings(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(format!("{err:#}").contains("Parsing settings JSON"));
    }

    #[test]
    fn missing_optional_settings_are_none() {
        assert!(load_optional_settings(None).unwrap().is_none());
    }
}
