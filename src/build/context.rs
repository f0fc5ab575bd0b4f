//! Build context containing configuration and paths for a build.

use crate::build::BuildError;
use crate::config::{find_config_from, load_config, merge_cli_overrides, CliOverrides, MuaConfig};
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for one manifest.
///
/// The registry root defaults to the manifest's directory: raw image paths
/// and relative companion paths in the generated module are written relative
/// to it.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: MuaConfig,
    /// File the configuration was read from, if any
    config_path: Option<PathBuf>,
    /// Root manifest file
    manifest: PathBuf,
    /// Directory the generated module is relative to
    root: PathBuf,
    /// Where to write the generated module, if anywhere
    output: Option<PathBuf>,
    /// Where to write a Make-style depfile, if anywhere
    depfile: Option<PathBuf>,
}

impl BuildContext {
    /// Create a new build context for a manifest file.
    pub fn new(config: MuaConfig, manifest: PathBuf) -> Self {
        let root = manifest.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { config, config_path: None, manifest, root, output: None, depfile: None }
    }

    /// Create a context with configuration found next to (or above) the manifest.
    ///
    /// An explicit `config_path` skips the search. CLI overrides are applied last.
    pub fn load(
        manifest: PathBuf,
        config_path: Option<&Path>,
        overrides: &CliOverrides,
    ) -> Result<Self, BuildError> {
        let found = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let start = manifest.parent().map(Path::to_path_buf).unwrap_or_default();
                let start = if start.as_os_str().is_empty() { PathBuf::from(".") } else { start };
                find_config_from(start)
            }
        };

        let mut config = load_config(found.as_deref())?;
        merge_cli_overrides(&mut config, overrides);
        Ok(Self::new(config, manifest).with_config_path(found))
    }

    /// Get the configuration.
    pub fn config(&self) -> &MuaConfig {
        &self.config
    }

    /// Config file the build depends on, if one was loaded.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Get the root manifest path.
    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// Get the registry root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn depfile(&self) -> Option<&Path> {
        self.depfile.as_deref()
    }

    /// Record the config file the configuration came from.
    pub fn with_config_path(mut self, config_path: Option<PathBuf>) -> Self {
        self.config_path = config_path;
        self
    }

    /// Set the registry root.
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = root;
        self
    }

    /// Set the output file for the generated module.
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    /// Set the depfile path.
    pub fn with_depfile(mut self, depfile: Option<PathBuf>) -> Self {
        self.depfile = depfile;
        self
    }

    /// Target named in the depfile rule: the output, or the manifest itself.
    pub fn depfile_target(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.manifest)
    }
}
