//! Manifest resolution.
//!
//! Turns a manifest into the ordered list of classified assets it describes,
//! along with every file that was read on the way.
//!
//! # Algorithm
//!
//! 1. Parse the manifest in the configured [`Dialect`]
//! 2. Resolve every import concurrently, each relative to its own directory
//! 3. Discover the local includes relative to the manifest directory
//! 4. Read, parse and classify the local files concurrently
//! 5. Concatenate imported assets (in import order) and local assets (in
//!    discovery order)
//!
//! Each stage waits for all of its tasks before the next one starts and the
//! first failing task fails the stage. Import chains are tracked by
//! canonical path so a manifest that imports one of its ancestors is reported
//! as a [`ResolveError::CircularImport`] instead of recursing forever.

use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build::discovery::{discover, DiscoveryError};
use crate::classify::{classify, ClassifiedAsset};
use crate::content::{ContentParser, RawFile};
use crate::manifest::{Dialect, Manifest, ManifestError};

/// Error resolving a manifest tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// A manifest document is malformed
    #[error("Invalid manifest{}: {source}", describe_origin(.path))]
    ManifestParse {
        path: Option<PathBuf>,
        #[source]
        source: ManifestError,
    },
    /// Include/exclude expansion failed
    #[error("File discovery failed in '{}': {source}", .working_dir.display())]
    Discovery {
        working_dir: PathBuf,
        #[source]
        source: DiscoveryError,
    },
    /// A manifest or asset file could not be read
    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A manifest imports one of its own ancestors
    #[error("Circular import detected: {cycle}")]
    CircularImport { path: PathBuf, cycle: String },
}

fn describe_origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" '{}'", path.display()),
        None => String::new(),
    }
}

impl ResolveError {
    /// The file this error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolveError::ManifestParse { path, .. } => path.as_deref(),
            ResolveError::Discovery { .. } => None,
            ResolveError::Read { path, .. } => Some(path),
            ResolveError::CircularImport { path, .. } => Some(path),
        }
    }
}

/// A failed resolution together with the files it had already touched.
///
/// The dependencies always include the file named by the error, so a host
/// build can rerun once the missing or broken file is fixed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ResolveFailure {
    #[source]
    pub error: ResolveError,
    pub dependencies: BTreeSet<PathBuf>,
}

impl ResolveFailure {
    fn new(error: ResolveError) -> Self {
        let dependencies = error.path().map(Path::to_path_buf).into_iter().collect();
        Self { error, dependencies }
    }

    fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = PathBuf>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }
}

/// Assets and dependencies produced by resolving a manifest tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Imported assets first (in import order), then local assets
    pub assets: Vec<ClassifiedAsset>,
    /// Every file read at any depth
    pub dependencies: BTreeSet<PathBuf>,
}

impl Resolution {
    fn append(&mut self, other: Resolution) {
        self.assets.extend(other.assets);
        self.dependencies.extend(other.dependencies);
    }
}

/// Resolves manifests into classified assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestResolver {
    dialect: Dialect,
}

impl ManifestResolver {
    /// Create a resolver reading manifests in the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Resolve manifest text whose relative paths start at `working_dir`.
    pub fn resolve(
        &self,
        manifest_text: &str,
        working_dir: &Path,
    ) -> Result<Resolution, ResolveFailure> {
        self.resolve_source(manifest_text.as_bytes(), None, working_dir, &[])
    }

    /// Read and resolve a manifest file. The file itself is a dependency.
    pub fn resolve_file(&self, path: &Path) -> Result<Resolution, ResolveFailure> {
        let (bytes, canonical) = read_manifest(path).map_err(ResolveFailure::new)?;
        let mut resolution = self
            .resolve_source(&bytes, Some(path), &parent_dir(path), &[canonical])
            .map_err(|failure| failure.with_dependencies([path.to_path_buf()]))?;
        resolution.dependencies.insert(path.to_path_buf());
        Ok(resolution)
    }

    fn resolve_source(
        &self,
        source: &[u8],
        origin: Option<&Path>,
        working_dir: &Path,
        chain: &[PathBuf],
    ) -> Result<Resolution, ResolveFailure> {
        let manifest = Manifest::parse(source, self.dialect).map_err(|source| {
            ResolveFailure::new(ResolveError::ManifestParse {
                path: origin.map(Path::to_path_buf),
                source,
            })
        })?;

        log::debug!(
            "resolving {} in '{}': {} import(s), {} include pattern(s)",
            origin.map_or_else(|| "<inline manifest>".to_string(), |p| p.display().to_string()),
            working_dir.display(),
            manifest.imports.len(),
            manifest.includes.len()
        );

        let imported = manifest
            .imports
            .par_iter()
            .map(|import| self.resolve_import(import, working_dir, chain))
            .collect::<Result<Vec<_>, _>>()?;

        let mut resolution = Resolution::default();
        for sub in imported {
            resolution.append(sub);
        }

        let local = resolve_local(&manifest, working_dir)
            .map_err(|failure| failure.with_dependencies(resolution.dependencies.clone()))?;
        resolution.append(local);

        Ok(resolution)
    }

    fn resolve_import(
        &self,
        import: &str,
        working_dir: &Path,
        chain: &[PathBuf],
    ) -> Result<Resolution, ResolveFailure> {
        let path = working_dir.join(import);
        let (bytes, canonical) = read_manifest(&path).map_err(ResolveFailure::new)?;

        if let Some(start) = chain.iter().position(|ancestor| *ancestor == canonical) {
            let cycle = chain[start..]
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ResolveFailure::new(ResolveError::CircularImport { path, cycle }));
        }

        let mut nested = chain.to_vec();
        nested.push(canonical);

        let mut resolution = self
            .resolve_source(&bytes, Some(&path), &parent_dir(&path), &nested)
            .map_err(|failure| failure.with_dependencies([path.clone()]))?;
        resolution.dependencies.insert(path);
        Ok(resolution)
    }
}

/// Discover, read and classify a manifest's own files.
fn resolve_local(manifest: &Manifest, working_dir: &Path) -> Result<Resolution, ResolveFailure> {
    let files = discover(&manifest.includes, &manifest.excludes, working_dir).map_err(|source| {
        ResolveFailure::new(ResolveError::Discovery { working_dir: working_dir.to_path_buf(), source })
    })?;
    let dependencies: BTreeSet<PathBuf> = files.iter().cloned().collect();

    let raw = files
        .par_iter()
        .map(|path| {
            RawFile::read(path).map_err(|source| ResolveError::Read { path: path.clone(), source })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| ResolveFailure::new(error).with_dependencies(dependencies.clone()))?;

    let assets = raw.into_par_iter().map(|file| classify(ContentParser::parse_file(file))).collect();

    Ok(Resolution { assets, dependencies })
}

fn read_manifest(path: &Path) -> Result<(Vec<u8>, PathBuf), ResolveError> {
    let read_error = |source| ResolveError::Read { path: path.to_path_buf(), source };
    let bytes = fs::read(path).map_err(read_error)?;
    let canonical = path.canonicalize().map_err(read_error)?;
    Ok((bytes, canonical))
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{AssetKind, Payload};

    use tempfile::TempDir;

    const PATH_JSON: &str = r#"{"meta": {"type": "path"}, "points": []}"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn file_names(resolution: &Resolution) -> Vec<String> {
        resolution
            .assets
            .iter()
            .map(|asset| asset.path().file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_local_assets_in_discovery_order() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.json", PATH_JSON);
        write(temp.path(), "b.json", r#"{"foo": 1}"#);
        write(temp.path(), "c.tmx", r#"<map tiledversion="1.9"/>"#);

        let resolution = ManifestResolver::default()
            .resolve(r#"{"includes": ["*.tmx", "*.json"]}"#, temp.path())
            .unwrap();

        assert_eq!(file_names(&resolution), vec!["c.tmx", "a.json", "b.json"]);
        let kinds: Vec<AssetKind> = resolution.assets.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![AssetKind::Stage, AssetKind::Path, AssetKind::Unclassified]);
        assert_eq!(resolution.dependencies.len(), 3);
    }

    #[test]
    fn test_imports_precede_local_assets() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "first/assets.json", r#"{"includes": ["*.json"], "excludes": ["assets.json"]}"#);
        write(temp.path(), "first/f1.json", PATH_JSON);
        write(temp.path(), "first/f2.json", PATH_JSON);
        write(temp.path(), "second/assets.json", r#"{"includes": ["*.png"]}"#);
        write(temp.path(), "second/s1.png", "not really a png");
        write(temp.path(), "local.json", PATH_JSON);

        let resolution = ManifestResolver::default()
            .resolve(
                r#"{"imports": ["first/assets.json", "second/assets.json"], "includes": ["*.json"]}"#,
                temp.path(),
            )
            .unwrap();

        assert_eq!(file_names(&resolution), vec!["f1.json", "f2.json", "s1.png", "local.json"]);
        assert!(resolution.dependencies.contains(&temp.path().join("first/assets.json")));
        assert!(resolution.dependencies.contains(&temp.path().join("second/assets.json")));
        assert!(resolution.dependencies.contains(&temp.path().join("second/s1.png")));
        assert_eq!(resolution.dependencies.len(), 6);
    }

    #[test]
    fn test_import_order_is_list_order() {
        let temp = TempDir::new().unwrap();
        for name in ["z", "a", "m"] {
            write(temp.path(), &format!("{name}/assets.json"), r#"{"includes": ["*.json"], "excludes": ["assets.json"]}"#);
            write(temp.path(), &format!("{name}/{name}.json"), PATH_JSON);
        }

        let resolution = ManifestResolver::default()
            .resolve(
                r#"{"imports": ["z/assets.json", "a/assets.json", "m/assets.json"]}"#,
                temp.path(),
            )
            .unwrap();
        assert_eq!(file_names(&resolution), vec!["z.json", "a.json", "m.json"]);
    }

    #[test]
    fn test_nested_imports_use_their_own_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "outer/assets.json", r#"{"imports": ["inner/assets.json"]}"#);
        write(temp.path(), "outer/inner/assets.json", r#"{"includes": ["*.tsx"]}"#);
        write(temp.path(), "outer/inner/terrain.tsx", r#"<tileset name="terrain"/>"#);

        let resolution = ManifestResolver::default()
            .resolve(r#"{"imports": ["outer/assets.json"]}"#, temp.path())
            .unwrap();

        assert_eq!(resolution.assets.len(), 1);
        assert_eq!(resolution.assets[0].kind(), AssetKind::Tileset);
        assert_eq!(resolution.assets[0].path(), temp.path().join("outer/inner/terrain.tsx"));
    }

    #[test]
    fn test_diamond_imports_are_allowed() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "shared/assets.json", r#"{"includes": ["*.png"]}"#);
        write(temp.path(), "shared/icon.png", "\u{1}binary");
        write(temp.path(), "left/assets.json", r#"{"imports": ["../shared/assets.json"]}"#);
        write(temp.path(), "right/assets.json", r#"{"imports": ["../shared/assets.json"]}"#);

        let resolution = ManifestResolver::default()
            .resolve(r#"{"imports": ["left/assets.json", "right/assets.json"]}"#, temp.path())
            .unwrap();

        assert_eq!(file_names(&resolution), vec!["icon.png", "icon.png"]);
        assert!(matches!(resolution.assets[0].payload(), Payload::File(_)));
    }

    #[test]
    fn test_missing_import_fails_with_read_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.json", PATH_JSON);

        let failure = ManifestResolver::default()
            .resolve(r#"{"imports": ["missing.json"], "includes": ["*.json"]}"#, temp.path())
            .unwrap_err();

        assert!(matches!(failure.error, ResolveError::Read { .. }));
        assert_eq!(failure.error.path(), Some(temp.path().join("missing.json").as_path()));
        assert!(failure.dependencies.contains(&temp.path().join("missing.json")));
    }

    #[test]
    fn test_nested_failure_reports_whole_branch() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "mid/assets.json", r#"{"imports": ["gone.json"]}"#);

        let failure = ManifestResolver::default()
            .resolve(r#"{"imports": ["mid/assets.json"]}"#, temp.path())
            .unwrap_err();

        assert!(failure.dependencies.contains(&temp.path().join("mid/assets.json")));
        assert!(failure.dependencies.contains(&temp.path().join("mid/gone.json")));
    }

    #[test]
    fn test_invalid_imported_manifest() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "broken.json", "{ not json");

        let failure = ManifestResolver::default()
            .resolve(r#"{"imports": ["broken.json"]}"#, temp.path())
            .unwrap_err();

        assert!(matches!(failure.error, ResolveError::ManifestParse { .. }));
        assert!(failure.to_string().contains("broken.json"));
    }

    #[test]
    fn test_invalid_root_manifest() {
        let temp = TempDir::new().unwrap();
        let failure = ManifestResolver::default().resolve("[]", temp.path()).unwrap_err();
        assert!(matches!(failure.error, ResolveError::ManifestParse { path: None, .. }));
        assert!(failure.dependencies.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_discovery_error() {
        let temp = TempDir::new().unwrap();
        let failure = ManifestResolver::default()
            .resolve(r#"{"includes": ["a/***/b"]}"#, temp.path())
            .unwrap_err();
        assert!(matches!(failure.error, ResolveError::Discovery { .. }));
    }

    #[test]
    fn test_circular_import_detected() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.json", r#"{"imports": ["b.json"]}"#);
        write(temp.path(), "b.json", r#"{"imports": ["a.json"]}"#);

        let failure = ManifestResolver::default().resolve_file(&a).unwrap_err();
        match &failure.error {
            ResolveError::CircularImport { cycle, .. } => {
                assert!(cycle.contains("a.json -> "));
                assert!(cycle.ends_with("a.json"));
            }
            other => panic!("expected circular import, got {other:?}"),
        }
        assert!(failure.dependencies.contains(&a));
        assert!(failure.dependencies.contains(&temp.path().join("b.json")));
    }

    #[test]
    fn test_self_import_detected() {
        let temp = TempDir::new().unwrap();
        let me = write(temp.path(), "me.json", r#"{"imports": ["./me.json"]}"#);

        let failure = ManifestResolver::default().resolve_file(&me).unwrap_err();
        assert!(matches!(failure.error, ResolveError::CircularImport { .. }));
    }

    #[test]
    fn test_resolve_file_records_manifest() {
        let temp = TempDir::new().unwrap();
        let manifest = write(temp.path(), "assets.json", r#"{"includes": ["*.tmx"]}"#);
        write(temp.path(), "level.tmx", r#"<map tiledversion="1.9"/>"#);

        let resolution = ManifestResolver::default().resolve_file(&manifest).unwrap();
        assert!(resolution.dependencies.contains(&manifest));
        assert_eq!(resolution.assets.len(), 1);
    }

    #[test]
    fn test_legacy_dialect() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.json", PATH_JSON);
        write(temp.path(), "b.json", PATH_JSON);

        let resolver = ManifestResolver::new(Dialect::Legacy);
        assert_eq!(resolver.dialect(), Dialect::Legacy);
        let resolution =
            resolver.resolve(r#"{"include": ["*.json"], "exclude": ["b.json"]}"#, temp.path()).unwrap();
        assert_eq!(file_names(&resolution), vec!["a.json"]);
    }

    #[test]
    fn test_empty_manifest() {
        let temp = TempDir::new().unwrap();
        let resolution = ManifestResolver::default().resolve("{}", temp.path()).unwrap();
        assert!(resolution.assets.is_empty());
        assert!(resolution.dependencies.is_empty());
    }
}
