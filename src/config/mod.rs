mod schema;

pub use schema::Config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scoring::{validate_thresholds, ThresholdCatalog};

/// Get the config directory path (~/.config/loan-score/)
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("loan-score")
}

/// Get the default config file path (~/.config/loan-score/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Get the default profile store path (~/.config/loan-score/profiles.json)
pub fn get_profiles_path() -> PathBuf {
    get_config_dir().join("profiles.json")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/loan-score/config.yaml)
///
/// A missing file at the default path yields the default configuration; a
/// missing file at an explicit path is an error.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content).with_context(|| {
        format!("Failed to parse config: invalid YAML in {}", config_path.display())
    })?;

    Ok(config)
}

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let bands = &config.recommendation;
    if bands.approve_at > 100 {
        errors.push("recommendation.approve_at: must be at most 100".to_string());
    }
    if bands.review_at > bands.approve_at {
        errors.push(format!(
            "recommendation.review_at: {} exceeds approve_at {}",
            bands.review_at, bands.approve_at
        ));
    }
    if config.log_level.trim().is_empty() {
        errors.push("log_level: must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Load a YAML threshold catalog and check its rules.
pub fn load_thresholds(path: &Path) -> Result<ThresholdCatalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read thresholds file at {}", path.display()))?;

    let catalog: ThresholdCatalog = serde_saphyr::from_str(&content)
        .with_context(|| format!("Failed to parse thresholds: invalid YAML in {}", path.display()))?;

    if let Err(errors) = validate_thresholds(&catalog) {
        anyhow::bail!(
            "Invalid thresholds in {}: {}",
            path.display(),
            errors.join("; ")
        );
    }

    Ok(catalog)
}

impl Config {
    pub fn profiles_path(&self) -> PathBuf {
        self.profiles_path.clone().unwrap_or_else(get_profiles_path)
    }

    /// The configured threshold catalog, or the built-in one.
    pub fn threshold_catalog(&self) -> Result<ThresholdCatalog> {
        match &self.thresholds {
            Some(path) => load_thresholds(path),
            None => Ok(ThresholdCatalog::builtin()),
        }
    }
}
