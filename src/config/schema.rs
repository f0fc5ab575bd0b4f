//! Configuration schema types for `mua.toml`
//!
//! ```toml
//! [manifest]
//! dialect = "legacy"
//!
//! [output]
//! format = "esm"
//! on_collision = "error"
//! companion_paths = "relative"
//!
//! [runtime]
//! module = "mu-engine"
//! constructor = "Assets"
//! preload = true
//! ```
//!
//! Every section is optional. Without `[runtime]` the registry is exported as
//! a plain object literal.

use serde::{Deserialize, Serialize};

use crate::manifest::Dialect;
use crate::registry::{CollisionPolicy, CompanionPaths, EmitOptions, ModuleFormat, RuntimeBinding};

/// How manifests are read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestConfig {
    /// Field naming of manifest documents
    #[serde(default)]
    pub dialect: Dialect,
}

/// Shape of the generated module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// CommonJS or ES module output
    #[serde(default)]
    pub format: ModuleFormat,
    /// Behavior when two assets derive the same key
    #[serde(default)]
    pub on_collision: CollisionPolicy,
    /// How companion module specifiers are written
    #[serde(default)]
    pub companion_paths: CompanionPaths,
}

/// Complete `mua.toml` configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuaConfig {
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Runtime constructor wrapping the registry literal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeBinding>,
}

/// Validation error with field path context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "runtime.constructor")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mua.toml: '{}' {}", self.field, self.message)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

impl MuaConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if let Some(runtime) = &self.runtime {
            if runtime.module.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: "runtime.module".to_string(),
                    message: "must be a non-empty module specifier".to_string(),
                });
            }
            if !is_identifier(&runtime.constructor) {
                errors.push(ConfigValidationError {
                    field: "runtime.constructor".to_string(),
                    message: format!("'{}' is not a valid identifier", runtime.constructor),
                });
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Registry generation options described by this configuration.
    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions::default()
            .with_format(self.output.format)
            .with_collision_policy(self.output.on_collision)
            .with_companion_paths(self.output.companion_paths)
            .with_runtime(self.runtime.clone())
    }
}
