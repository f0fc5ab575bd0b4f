//! Configuration loading and discovery for `mua.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::MuaConfig;
use crate::manifest::Dialect;
use crate::registry::{CollisionPolicy, ModuleFormat};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILENAME: &str = "mua.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse mua.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override manifest dialect
    pub dialect: Option<Dialect>,
    /// Override module format
    pub format: Option<ModuleFormat>,
    /// Override key collision handling
    pub on_collision: Option<CollisionPolicy>,
    /// Drop the `[runtime]` wrapper
    pub no_runtime: bool,
}

/// Find mua.toml by walking up from a directory.
///
/// # Returns
/// - `Some(path)` for the nearest mua.toml at or above `start`
/// - `None` if no config file is found
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a mua.toml file.
///
/// Without a path the default configuration is returned.
///
/// # Example
/// ```ignore
/// let config = load_config(find_config_from(manifest_dir).as_deref())?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<MuaConfig, ConfigError> {
    match path {
        Some(p) => load_config_file(p),
        None => Ok(MuaConfig::default()),
    }
}

fn load_config_file(path: &Path) -> Result<MuaConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: MuaConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut MuaConfig, overrides: &CliOverrides) {
    if let Some(dialect) = overrides.dialect {
        config.manifest.dialect = dialect;
    }

    if let Some(format) = overrides.format {
        config.output.format = format;
    }

    if let Some(policy) = overrides.on_collision {
        config.output.on_collision = policy;
    }

    if overrides.no_runtime {
        config.runtime = None;
    }
}
