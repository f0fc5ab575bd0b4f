//! Asset manifest documents.
//!
//! A manifest is a small JSON document naming the files that make up an asset
//! registry and the other manifests it pulls in:
//!
//! ```json
//! {
//!   "imports": ["../shared/assets.json"],
//!   "includes": ["sprites/*.json", "maps/*.tmx"],
//!   "excludes": ["sprites/wip-*"]
//! }
//! ```
//!
//! Two dialects exist. [`Dialect::Revised`] (the default) uses the plural
//! `includes`/`excludes` keys shown above, [`Dialect::Legacy`] uses the
//! singular `include`/`exclude` keys of older projects. A manifest using the
//! other dialect's keys is rejected instead of silently resolving to an empty
//! asset list. Unrelated keys (`description`, `$schema`, ...) are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error parsing a manifest document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// The document is not valid JSON or does not match the dialect
    #[error("{dialect} manifest: {source}")]
    Json {
        dialect: Dialect,
        #[source]
        source: serde_json::Error,
    },
    /// The document is valid JSON but not an object
    #[error("{dialect} manifest: expected a JSON object, found {found}")]
    NotAnObject { dialect: Dialect, found: &'static str },
    /// The document uses a key belonging to the other dialect
    #[error("{dialect} manifest: unexpected key '{key}' (did you mean '{expected}'?)")]
    ForeignKey { dialect: Dialect, key: String, expected: &'static str },
}

/// Field naming used by a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `includes` / `excludes` / `imports`
    #[default]
    Revised,
    /// `include` / `exclude` / `imports`
    Legacy,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Revised => write!(f, "revised"),
            Dialect::Legacy => write!(f, "legacy"),
        }
    }
}

impl Dialect {
    /// Keys of the other dialect, paired with this dialect's spelling.
    fn foreign_keys(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Dialect::Revised => &[("include", "includes"), ("exclude", "excludes")],
            Dialect::Legacy => &[("includes", "include"), ("excludes", "exclude")],
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Glob patterns of files to include, relative to the manifest directory
    pub includes: Vec<String>,
    /// Glob patterns removed from the include matches
    pub excludes: Vec<String>,
    /// Paths of sub-manifests, resolved before the local includes
    pub imports: Vec<String>,
}

#[derive(Deserialize)]
struct RevisedDocument {
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
    #[serde(default)]
    imports: Vec<String>,
}

#[derive(Deserialize)]
struct LegacyDocument {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    imports: Vec<String>,
}

impl Manifest {
    /// Parse a manifest from raw bytes using the given dialect.
    pub fn parse(source: &[u8], dialect: Dialect) -> Result<Self, ManifestError> {
        let wrap = |source| ManifestError::Json { dialect, source };
        let value: Value = serde_json::from_slice(source).map_err(wrap)?;
        let map = match value {
            Value::Object(map) => map,
            other => return Err(ManifestError::NotAnObject { dialect, found: json_type(&other) }),
        };

        for (foreign, expected) in dialect.foreign_keys() {
            if map.contains_key(*foreign) {
                return Err(ManifestError::ForeignKey { dialect, key: foreign.to_string(), expected: *expected });
            }
        }

        let value = Value::Object(map);
        match dialect {
            Dialect::Revised => {
                let doc: RevisedDocument = serde_json::from_value(value).map_err(wrap)?;
                Ok(Self { includes: doc.includes, excludes: doc.excludes, imports: doc.imports })
            }
            Dialect::Legacy => {
                let doc: LegacyDocument = serde_json::from_value(value).map_err(wrap)?;
                Ok(Self { includes: doc.include, excludes: doc.exclude, imports: doc.imports })
            }
        }
    }

    /// True if the manifest neither imports nor includes anything.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.imports.is_empty()
    }
}
