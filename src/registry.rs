//! Registry code generation.
//!
//! Turns the ordered list of classified assets into JavaScript module source.
//! Every asset becomes one entry of an object literal keyed by the file name
//! up to its first dot:
//!
//! ```text
//! {
//!   "walk": {"type":"sprite","data":{...}},
//!   "hero": {"type":"rawimage","data":"./img/hero.png"},
//!   "walk-cycle": { data: require("./walk-cycle")["WalkCycle"] }
//! }
//! ```
//!
//! Entries are written in input order and never deduplicated, so when two
//! assets share a key the later one wins once the literal is evaluated.
//! [`Registry::collisions`] reports those keys and [`CollisionPolicy::Error`]
//! turns them into an [`EmitError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::classify::{AssetKind, ClassifiedAsset, Payload};

/// First line of every generated module.
pub const HEADER: &str = "// Generated by mua. Do not edit.\n";

/// Prefix of the namespace bindings hoisted for companion modules in ESM output.
const COMPANION_BINDING: &str = "__companion";

/// Error generating a registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmitError {
    /// Two assets derive the same key and collisions are not allowed
    #[error("Asset key '{key}' is used by both '{}' and '{}'", .first.display(), .second.display())]
    KeyCollision { key: String, first: PathBuf, second: PathBuf },
}

/// Module system of the generated source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// `require(...)` / `module.exports = ...`
    #[default]
    #[value(name = "commonjs")]
    CommonJs,
    /// `import ...` / `export default ...`
    Esm,
}

impl std::fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleFormat::CommonJs => write!(f, "commonjs"),
            ModuleFormat::Esm => write!(f, "esm"),
        }
    }
}

/// What to do when two assets derive the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Keep every entry; the later one wins (logged as a warning)
    #[default]
    LastWins,
    /// Refuse to generate the registry
    Error,
}

/// How companion module paths are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompanionPaths {
    /// `./<key>`, directory stripped
    #[default]
    Flat,
    /// `./<dir>/<key>` with the directory relative to the registry root
    Relative,
}

fn default_runtime_module() -> String {
    "mu-engine".to_string()
}

fn default_constructor() -> String {
    "Assets".to_string()
}

fn default_preload() -> bool {
    true
}

/// Runtime class the registry literal is handed to.
///
/// Renders `new Assets({ preload: true, assets: {...} })` with `Assets`
/// imported from `mu-engine` by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeBinding {
    /// Module exporting the constructor
    #[serde(default = "default_runtime_module")]
    pub module: String,
    /// Named export to instantiate
    #[serde(default = "default_constructor")]
    pub constructor: String,
    /// Passed through as the `preload` option
    #[serde(default = "default_preload")]
    pub preload: bool,
}

impl Default for RuntimeBinding {
    fn default() -> Self {
        Self {
            module: default_runtime_module(),
            constructor: default_constructor(),
            preload: default_preload(),
        }
    }
}

/// Options controlling the generated module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmitOptions {
    pub format: ModuleFormat,
    pub on_collision: CollisionPolicy,
    pub companion_paths: CompanionPaths,
    pub runtime: Option<RuntimeBinding>,
}

impl EmitOptions {
    pub fn with_format(mut self, format: ModuleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.on_collision = policy;
        self
    }

    pub fn with_companion_paths(mut self, paths: CompanionPaths) -> Self {
        self.companion_paths = paths;
        self
    }

    pub fn with_runtime(mut self, runtime: Option<RuntimeBinding>) -> Self {
        self.runtime = runtime;
        self
    }
}

/// Registry key of a file: its name up to the first `.`.
pub fn asset_key(path: &Path) -> String {
    let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// Export name a companion module is expected to provide for a key.
///
/// `walk-cycle` becomes `WalkCycle`, `big_boss` becomes `BigBoss`.
pub fn export_identifier(key: &str) -> String {
    key.split(|c| c == '-' || c == '_').filter(|segment| !segment.is_empty()).map(capitalize).collect()
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Absolute form of `path` against `base` with `.` and `..` folded away.
fn normalize(path: &Path, base: &Path) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }
    normal
}

/// Segments leading from `root` to `path`, `..` included. Both paths are
/// expected to be normalized.
///
/// `None` if the paths are anchored differently (another drive, or one
/// absolute and one relative).
fn relative_to(path: &Path, root: &Path) -> Option<Vec<String>> {
    let path: Vec<Component> = path.components().collect();
    let root: Vec<Component> = root.components().collect();
    let anchored = |components: &[Component]| {
        matches!(components.first(), Some(Component::Prefix(_) | Component::RootDir))
    };
    if (anchored(&path[..]) || anchored(&root[..])) && path.first() != root.first() {
        return None;
    }

    let common = path.iter().zip(&root).take_while(|(a, b)| a == b).count();
    let parts = root[common..]
        .iter()
        .map(|_| "..".to_string())
        .chain(path[common..].iter().map(|c| c.as_os_str().to_string_lossy().into_owned()))
        .collect();
    Some(parts)
}

/// `./a/b` for paths below the root, `../a/b` for paths beside it.
fn dot_path(parts: &[String]) -> String {
    match parts.first().map(String::as_str) {
        Some("..") => parts.join("/"),
        _ => format!("./{}", parts.join("/")),
    }
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// Value of a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    /// Embedded `{"type": kind, "data": data}` record
    Inline { kind: AssetKind, data: Value },
    /// Named export of a companion module
    Companion {
        /// Directory relative to the registry root, `..` segments included;
        /// `None` when it is the root itself
        dir: Option<String>,
        export: String,
    },
}

/// One keyed entry of the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    /// File the entry was generated from
    pub source: PathBuf,
    pub value: EntryValue,
}

impl Entry {
    fn from_asset(asset: &ClassifiedAsset, root: &Path, cwd: &Path) -> Self {
        let key = asset_key(asset.path());
        let value = match asset.payload() {
            Payload::Data(data) => EntryValue::Inline { kind: asset.kind(), data: data.clone() },
            Payload::File(file) => {
                let file = normalize(file, cwd);
                let location = match relative_to(&file, root) {
                    Some(parts) => dot_path(&parts),
                    None => slash_path(&file),
                };
                EntryValue::Inline { kind: asset.kind(), data: Value::String(location) }
            }
            Payload::Companion => {
                let dir = asset
                    .path()
                    .parent()
                    .and_then(|parent| relative_to(&normalize(parent, cwd), root))
                    .map(|parts| parts.join("/"))
                    .filter(|dir| !dir.is_empty());
                EntryValue::Companion { dir, export: export_identifier(&key) }
            }
        };
        Self { key, source: asset.path().to_path_buf(), value }
    }

    /// Module specifier of a companion entry.
    pub fn module_path(&self, paths: CompanionPaths) -> Option<String> {
        match &self.value {
            EntryValue::Inline { .. } => None,
            EntryValue::Companion { dir, .. } => match (paths, dir) {
                (CompanionPaths::Relative, Some(dir)) if dir.starts_with("..") => {
                    Some(format!("{}/{}", dir, self.key))
                }
                (CompanionPaths::Relative, Some(dir)) => Some(format!("./{}/{}", dir, self.key)),
                _ => Some(format!("./{}", self.key)),
            },
        }
    }
}

/// A key used by more than one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub key: String,
    /// Entry being overwritten
    pub first: PathBuf,
    /// Entry that wins
    pub second: PathBuf,
}

/// Ordered registry entries ready to be rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// Build entries for assets, in order. Paths are made relative to `root`;
    /// relative asset paths and a relative root are both taken from the
    /// current directory.
    pub fn from_assets(assets: &[ClassifiedAsset], root: &Path) -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        let root = normalize(root, &cwd);
        let entries = assets.iter().map(|asset| Entry::from_asset(asset, &root, &cwd)).collect();
        Self { entries }
    }

    /// Every entry in input order, duplicates included.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The mapping the literal evaluates to: one entry per key, positioned
    /// where the key first appeared, holding the last entry with that key.
    pub fn resolved(&self) -> Vec<&Entry> {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut resolved: Vec<&Entry> = Vec::new();
        for entry in &self.entries {
            match slots.get(entry.key.as_str()) {
                Some(&slot) => resolved[slot] = entry,
                None => {
                    slots.insert(entry.key.as_str(), resolved.len());
                    resolved.push(entry);
                }
            }
        }
        resolved
    }

    /// Keys that appear more than once, one item per overwrite.
    pub fn collisions(&self) -> Vec<Collision> {
        let mut winners: HashMap<&str, &Path> = HashMap::new();
        let mut collisions = Vec::new();
        for entry in &self.entries {
            if let Some(previous) = winners.insert(entry.key.as_str(), entry.source.as_path()) {
                collisions.push(Collision {
                    key: entry.key.clone(),
                    first: previous.to_path_buf(),
                    second: entry.source.clone(),
                });
            }
        }
        collisions
    }

    /// Apply a collision policy: warn for each collision or fail on the first.
    pub fn check_collisions(&self, policy: CollisionPolicy) -> Result<(), EmitError> {
        for collision in self.collisions() {
            match policy {
                CollisionPolicy::Error => {
                    return Err(EmitError::KeyCollision {
                        key: collision.key,
                        first: collision.first,
                        second: collision.second,
                    })
                }
                CollisionPolicy::LastWins => log::warn!(
                    "asset key '{}' from '{}' overrides '{}'",
                    collision.key,
                    collision.second.display(),
                    collision.first.display()
                ),
            }
        }
        Ok(())
    }

    /// Distinct companion module specifiers, in first-use order.
    pub fn companion_modules(&self, paths: CompanionPaths) -> Vec<String> {
        let mut modules: Vec<String> = Vec::new();
        for module in self.entries.iter().filter_map(|entry| entry.module_path(paths)) {
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        modules
    }

    /// Render the object literal.
    pub fn to_literal(&self, options: &EmitOptions) -> String {
        if self.entries.is_empty() {
            return "{}".to_string();
        }

        let modules = self.companion_modules(options.companion_paths);
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|entry| {
                let value = match &entry.value {
                    EntryValue::Inline { kind, data } => {
                        format!("{{\"type\":{},\"data\":{}}}", quote(kind.as_str()), data)
                    }
                    EntryValue::Companion { export, .. } => {
                        let module = entry.module_path(options.companion_paths).unwrap_or_default();
                        let target = match options.format {
                            ModuleFormat::CommonJs => format!("require({})", quote(&module)),
                            ModuleFormat::Esm => {
                                let index = modules.iter().position(|m| *m == module).unwrap_or(0);
                                format!("{}{}", COMPANION_BINDING, index)
                            }
                        };
                        format!("{{ data: {}[{}] }}", target, quote(export))
                    }
                };
                format!("  {}: {}", quote(&entry.key), value)
            })
            .collect();

        format!("{{\n{}\n}}", lines.join(",\n"))
    }

    /// Render the complete module source.
    pub fn to_module(&self, options: &EmitOptions) -> String {
        let mut out = String::from(HEADER);

        if let Some(runtime) = &options.runtime {
            out.push_str(&match options.format {
                ModuleFormat::CommonJs => format!(
                    "const {{ {} }} = require({});\n",
                    runtime.constructor,
                    quote(&runtime.module)
                ),
                ModuleFormat::Esm => {
                    format!("import {{ {} }} from {};\n", runtime.constructor, quote(&runtime.module))
                }
            });
        }
        if options.format == ModuleFormat::Esm {
            for (index, module) in self.companion_modules(options.companion_paths).iter().enumerate() {
                out.push_str(&format!(
                    "import * as {}{} from {};\n",
                    COMPANION_BINDING,
                    index,
                    quote(module)
                ));
            }
        }
        out.push('\n');

        let literal = self.to_literal(options);
        let value = match &options.runtime {
            Some(runtime) => format!(
                "new {}({{\n  preload: {},\n  assets: {}\n}})",
                runtime.constructor,
                runtime.preload,
                literal.replace('\n', "\n  ")
            ),
            None => literal,
        };

        match options.format {
            ModuleFormat::CommonJs => out.push_str(&format!("module.exports = {};\n", value)),
            ModuleFormat::Esm => out.push_str(&format!("export default {};\n", value)),
        }
        out
    }
}

/// Generate module source for an ordered asset list.
///
/// `root` is the directory the generated module lives in; raw image paths and
/// relative companion paths are written relative to it.
pub fn emit(
    assets: &[ClassifiedAsset],
    root: &Path,
    options: &EmitOptions,
) -> Result<String, EmitError> {
    let registry = Registry::from_assets(assets, root);
    registry.check_collisions(options.on_collision)?;
    log::info!("emitting {} registry entries ({})", registry.len(), options.format);
    Ok(registry.to_module(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::content::ParsedContent;
    use serde_json::json;

    fn asset(path: &str, value: Option<Value>) -> ClassifiedAsset {
        classify(ParsedContent { path: PathBuf::from(path), value })
    }

    fn path_asset(path: &str) -> ClassifiedAsset {
        asset(path, Some(json!({"meta": {"type": "path"}, "points": []})))
    }

    #[test]
    fn test_asset_key() {
        assert_eq!(asset_key(Path::new("walk-cycle.json")), "walk-cycle");
        assert_eq!(asset_key(Path::new("/a/b/level.tmx")), "level");
        assert_eq!(asset_key(Path::new("hero.sheet.json")), "hero");
        assert_eq!(asset_key(Path::new("README")), "README");
    }

    #[test]
    fn test_export_identifier() {
        assert_eq!(export_identifier("walk-cycle"), "WalkCycle");
        assert_eq!(export_identifier("b"), "B");
        assert_eq!(export_identifier("BIG_boss"), "BigBoss");
        assert_eq!(export_identifier("a--b"), "AB");
        assert_eq!(export_identifier(""), "");
    }

    #[test]
    fn test_inline_and_companion_entries() {
        let root = Path::new("/project");
        let assets = vec![
            path_asset("/project/a.json"),
            asset("/project/b.json", Some(json!({"foo": 1}))),
        ];
        let literal = Registry::from_assets(&assets, root).to_literal(&EmitOptions::default());

        assert_eq!(
            literal,
            "{\n  \"a\": {\"type\":\"path\",\"data\":{\"meta\":{\"type\":\"path\"},\"points\":[]}},\n  \"b\": { data: require(\"./b\")[\"B\"] }\n}"
        );
    }

    #[test]
    fn test_raw_image_relative_to_root() {
        let root = Path::new("/project");
        let assets = vec![
            asset("/project/img/Hero.PNG", None),
            asset("/project/left/../shared/tile.png", None),
            asset("/elsewhere/far.png", None),
        ];
        let registry = Registry::from_assets(&assets, root);
        let data: Vec<&Value> = registry
            .entries()
            .iter()
            .map(|entry| match &entry.value {
                EntryValue::Inline { kind: AssetKind::RawImage, data } => data,
                other => panic!("unexpected entry {other:?}"),
            })
            .collect();

        assert_eq!(data, vec![&json!("./img/Hero.PNG"), &json!("./shared/tile.png"), &json!("../elsewhere/far.png")]);
    }

    fn raw_image_data(registry: &Registry) -> &Value {
        match &registry.entries()[0].value {
            EntryValue::Inline { kind: AssetKind::RawImage, data } => data,
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn test_raw_image_beside_relative_root() {
        let registry = Registry::from_assets(&[asset("game/img/hero.png", None)], Path::new("dist"));
        assert_eq!(raw_image_data(&registry), &json!("../game/img/hero.png"));

        let registry = Registry::from_assets(&[asset("game/img/hero.png", None)], Path::new("dist/js/"));
        assert_eq!(raw_image_data(&registry), &json!("../../game/img/hero.png"));
    }

    #[test]
    fn test_relative_asset_under_absolute_root() {
        let cwd = std::env::current_dir().unwrap();
        let assets = vec![asset("game/img/hero.png", None), asset("./game/ai/boss-ai.json", Some(json!({})))];
        let registry = Registry::from_assets(&assets, &cwd.join("game"));

        assert_eq!(raw_image_data(&registry), &json!("./img/hero.png"));
        assert_eq!(registry.companion_modules(CompanionPaths::Relative), vec!["./ai/boss-ai".to_string()]);
    }

    #[test]
    fn test_companion_dir_beside_root() {
        let assets = vec![asset("game/ai/boss-ai.json", Some(json!({})))];
        let registry = Registry::from_assets(&assets, Path::new("dist"));

        assert_eq!(registry.companion_modules(CompanionPaths::Relative), vec!["../game/ai/boss-ai".to_string()]);
        assert_eq!(registry.companion_modules(CompanionPaths::Flat), vec!["./boss-ai".to_string()]);
    }

    #[test]
    fn test_companion_paths() {
        let root = Path::new("/project");
        let assets = vec![
            asset("/project/sub/walk-cycle.json", Some(json!({}))),
            asset("/outside/boss.json", Some(json!({}))),
        ];
        let registry = Registry::from_assets(&assets, root);

        assert_eq!(
            registry.companion_modules(CompanionPaths::Flat),
            vec!["./walk-cycle".to_string(), "./boss".to_string()]
        );
        assert_eq!(
            registry.companion_modules(CompanionPaths::Relative),
            vec!["./sub/walk-cycle".to_string(), "../outside/boss".to_string()]
        );

        let literal = registry.to_literal(&EmitOptions::default());
        assert!(literal.contains(r#""walk-cycle": { data: require("./walk-cycle")["WalkCycle"] }"#));
    }

    #[test]
    fn test_collisions_last_wins() {
        let root = Path::new("/p");
        let assets = vec![
            path_asset("/p/a.json"),
            asset("/p/c.json", Some(json!({}))),
            asset("/p/a.xml", Some(json!({"map": {"$": {"tiledversion": "1.9"}}}))),
        ];
        let registry = Registry::from_assets(&assets, root);

        let resolved = registry.resolved();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].key, "a");
        assert_eq!(resolved[0].source, PathBuf::from("/p/a.xml"));
        assert_eq!(resolved[1].key, "c");

        assert_eq!(
            registry.collisions(),
            vec![Collision {
                key: "a".to_string(),
                first: PathBuf::from("/p/a.json"),
                second: PathBuf::from("/p/a.xml"),
            }]
        );

        // both entries stay in the literal; evaluation keeps the later one
        let literal = registry.to_literal(&EmitOptions::default());
        assert_eq!(literal.matches("\"a\":").count(), 2);
        assert!(registry.check_collisions(CollisionPolicy::LastWins).is_ok());
    }

    #[test]
    fn test_collision_error_policy() {
        let assets = vec![path_asset("/p/a.json"), path_asset("/p/sub/a.json")];
        let options = EmitOptions::default().with_collision_policy(CollisionPolicy::Error);

        let err = emit(&assets, Path::new("/p"), &options).unwrap_err();
        assert!(matches!(err, EmitError::KeyCollision { ref key, .. } if key == "a"));
        assert!(err.to_string().contains("sub/a.json"));
    }

    #[test]
    fn test_commonjs_module() {
        let assets = vec![path_asset("/p/a.json")];
        let source = emit(&assets, Path::new("/p"), &EmitOptions::default()).unwrap();

        assert!(source.starts_with(HEADER));
        assert!(source.contains("module.exports = {\n  \"a\": {\"type\":\"path\""));
        assert!(source.trim_end().ends_with("};"));
        assert!(!source.contains("import"));
    }

    #[test]
    fn test_esm_module_hoists_companions() {
        let assets = vec![
            asset("/p/b.json", Some(json!({}))),
            path_asset("/p/a.json"),
            asset("/p/b.xml", Some(json!({}))),
            asset("/p/c-d.json", Some(json!({}))),
        ];
        let options = EmitOptions::default().with_format(ModuleFormat::Esm);
        let source = emit(&assets, Path::new("/p"), &options).unwrap();

        assert_eq!(source.matches("import * as").count(), 2);
        assert!(source.contains("import * as __companion0 from \"./b\";"));
        assert!(source.contains("import * as __companion1 from \"./c-d\";"));
        assert!(source.contains("\"c-d\": { data: __companion1[\"CD\"] }"));
        assert!(source.contains("export default {"));
        assert!(!source.contains("require("));
    }

    #[test]
    fn test_runtime_wrapper() {
        let assets = vec![path_asset("/p/a.json")];
        let options = EmitOptions::default().with_runtime(Some(RuntimeBinding::default()));
        let source = emit(&assets, Path::new("/p"), &options).unwrap();

        assert!(source.contains("const { Assets } = require(\"mu-engine\");"));
        assert!(source.contains("module.exports = new Assets({\n  preload: true,\n  assets: {\n    \"a\": "));
        assert!(source.trim_end().ends_with("});"));

        let options = options.with_format(ModuleFormat::Esm);
        let source = emit(&assets, Path::new("/p"), &options).unwrap();
        assert!(source.contains("import { Assets } from \"mu-engine\";"));
        assert!(source.contains("export default new Assets({"));
    }

    #[test]
    fn test_empty_registry() {
        let source = emit(&[], Path::new("/p"), &EmitOptions::default()).unwrap();
        assert_eq!(source, format!("{}\nmodule.exports = {{}};\n", HEADER));
    }

    #[test]
    fn test_keys_are_escaped() {
        let assets = vec![path_asset("/p/we\"ird.json")];
        let literal = Registry::from_assets(&assets, Path::new("/p")).to_literal(&EmitOptions::default());
        assert!(literal.starts_with("{\n  \"we\\\"ird\": "));
    }
}
