//! Structural asset classification.
//!
//! Every asset gets exactly one [`AssetKind`]. Parsed content is checked
//! against [`PREDICATES`] in order and the first match wins; content that
//! matches nothing falls back to a path-based decision for raw images and
//! finally to [`AssetKind::Unclassified`]. Order matters: a document that
//! looks like both a tileset and a stage is a tileset.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::content::ParsedContent;

/// `meta.app` value written by Aseprite sprite sheet exports.
pub const ASEPRITE_APP: &str = "http://www.aseprite.org/";

/// The closed set of asset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Path/curve definition (`meta.type == "path"`)
    Path,
    /// Aseprite sprite sheet
    Sprite,
    /// Tiled tileset
    Tileset,
    /// Tiled map
    Stage,
    /// Image loaded by the runtime from its path
    RawImage,
    /// Provided by a companion module instead of inline data
    Unclassified,
}

impl AssetKind {
    /// Every kind, in classification priority order.
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Path,
        AssetKind::Sprite,
        AssetKind::Tileset,
        AssetKind::Stage,
        AssetKind::RawImage,
        AssetKind::Unclassified,
    ];

    /// Name used in the generated registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Path => "path",
            AssetKind::Sprite => "sprite",
            AssetKind::Tileset => "tileset",
            AssetKind::Stage => "stage",
            AssetKind::RawImage => "rawimage",
            AssetKind::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural test over parsed content.
pub type Predicate = fn(&Value) -> bool;

/// Ordered classification table; the first matching entry decides the kind.
pub const PREDICATES: &[(AssetKind, Predicate)] = &[
    (AssetKind::Path, is_path),
    (AssetKind::Sprite, is_sprite),
    (AssetKind::Tileset, is_tileset),
    (AssetKind::Stage, is_stage),
];

fn is_path(value: &Value) -> bool {
    value.get("meta").filter(|meta| meta.is_object()).and_then(|meta| meta.get("type"))
        == Some(&Value::from("path"))
}

fn is_sprite(value: &Value) -> bool {
    value.get("meta").filter(|meta| meta.is_object()).and_then(|meta| meta.get("app"))
        == Some(&Value::from(ASEPRITE_APP))
}

fn is_tileset(value: &Value) -> bool {
    value.get("type") == Some(&Value::from("tileset"))
        || value.get("tileset").is_some_and(Value::is_object)
}

fn is_stage(value: &Value) -> bool {
    value
        .get("map")
        .filter(|map| map.is_object())
        .and_then(|map| map.get("$"))
        .filter(|attrs| attrs.is_object())
        .and_then(|attrs| attrs.get("tiledversion"))
        .is_some_and(Value::is_string)
}

/// True if the path has a `.png` extension, ignoring case.
fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Decide the kind of a file from its parsed value and path.
pub fn classify_value(path: &Path, value: Option<&Value>) -> AssetKind {
    match value {
        Some(value) => PREDICATES
            .iter()
            .find(|(_, matches)| matches(value))
            .map(|(kind, _)| *kind)
            .unwrap_or(AssetKind::Unclassified),
        None if is_image_path(path) => AssetKind::RawImage,
        None => AssetKind::Unclassified,
    }
}

/// What the registry stores for an asset.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed content, embedded inline
    Data(Value),
    /// A file the runtime loads itself
    File(PathBuf),
    /// Nothing inline; the registry references a companion module
    Companion,
}

/// A file with its final classification.
///
/// The kind is decided once by [`classify`] and cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedAsset {
    path: PathBuf,
    kind: AssetKind,
    payload: Payload,
}

impl ClassifiedAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// True if the registry embeds this asset rather than referencing a module.
    pub fn is_inline(&self) -> bool {
        !matches!(self.payload, Payload::Companion)
    }
}

/// Classify parsed content.
pub fn classify(content: ParsedContent) -> ClassifiedAsset {
    let kind = classify_value(&content.path, content.value.as_ref());
    let payload = match (kind, content.value) {
        (AssetKind::Unclassified, _) => Payload::Companion,
        (AssetKind::RawImage, _) => Payload::File(content.path.clone()),
        (_, Some(value)) => Payload::Data(value),
        (_, None) => Payload::Companion,
    };
    log::debug!("{}: {}", content.path.display(), kind);
    ClassifiedAsset { path: content.path, kind, payload }
}
