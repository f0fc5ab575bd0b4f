//! Build pipeline orchestration.
//!
//! Resolves the root manifest, generates the registry module and writes the
//! module and depfile when the context asks for them. No output is written
//! unless the whole build succeeds; a depfile is written either way so the
//! host build reruns once the failing file is fixed.

use crate::build::depfile::write_depfile;
use crate::build::resolve::{ManifestResolver, ResolveFailure};
use crate::build::{BuildContext, BuildOutput};
use crate::config::ConfigError;
use crate::registry::{EmitError, Registry};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Error during build execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Manifest tree could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveFailure),
    /// Registry could not be generated
    #[error(transparent)]
    Emit(#[from] EmitError),
    /// Output or depfile could not be written
    #[error("Failed to write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Files read before a resolution failure.
    pub fn dependencies(&self) -> Option<&BTreeSet<PathBuf>> {
        match self {
            BuildError::Resolve(failure) => Some(&failure.dependencies),
            _ => None,
        }
    }
}

/// Build pipeline for one manifest.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the build pipeline.
    pub fn build(&self) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        let config = self.context.config();

        let resolver = ManifestResolver::new(config.manifest.dialect);
        let mut resolution = match resolver.resolve_file(self.context.manifest()) {
            Ok(resolution) => resolution,
            Err(mut failure) => {
                self.add_config_dependency(&mut failure.dependencies);
                if let Err(e) = self.write_depfile(&failure.dependencies) {
                    log::warn!("{}", e);
                }
                return Err(failure.into());
            }
        };
        self.add_config_dependency(&mut resolution.dependencies);

        let options = config.emit_options();
        let registry = Registry::from_assets(&resolution.assets, self.context.root());
        let emitted = registry.check_collisions(options.on_collision);
        self.write_depfile(&resolution.dependencies)?;
        emitted?;

        let source = registry.to_module(&options);
        if let Some(output) = self.context.output() {
            write_output(output, &source)?;
        }

        let mut kinds = BTreeMap::new();
        for asset in &resolution.assets {
            *kinds.entry(asset.kind()).or_insert(0) += 1;
        }

        let result = BuildOutput {
            source,
            output: self.context.output().map(Path::to_path_buf),
            asset_count: resolution.assets.len(),
            kinds,
            collisions: registry.collisions().into_iter().map(|c| c.key).collect(),
            dependencies: resolution.dependencies.into_iter().collect(),
            duration: start.elapsed(),
        };
        log::info!("{}: {} assets", self.context.manifest().display(), result.asset_count);
        Ok(result)
    }

    /// Resolve the manifest tree and return its dependencies only.
    pub fn dependencies(&self) -> Result<Vec<PathBuf>, BuildError> {
        let resolver = ManifestResolver::new(self.context.config().manifest.dialect);
        let mut dependencies = match resolver.resolve_file(self.context.manifest()) {
            Ok(resolution) => resolution.dependencies,
            Err(mut failure) => {
                self.add_config_dependency(&mut failure.dependencies);
                return Err(failure.into());
            }
        };
        self.add_config_dependency(&mut dependencies);
        Ok(dependencies.into_iter().collect())
    }

    /// Add the loaded config file, if any.
    fn add_config_dependency(&self, dependencies: &mut BTreeSet<PathBuf>) {
        if let Some(config_path) = self.context.config_path() {
            dependencies.insert(config_path.to_path_buf());
        }
    }

    fn write_depfile(&self, dependencies: &BTreeSet<PathBuf>) -> Result<(), BuildError> {
        let Some(depfile) = self.context.depfile() else {
            return Ok(());
        };
        write_depfile(depfile, self.context.depfile_target(), dependencies)
            .map_err(|source| BuildError::Io { path: depfile.to_path_buf(), source })
    }
}

fn write_output(path: &Path, source: &str) -> Result<(), BuildError> {
    let io_error = |source| BuildError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, source).map_err(io_error)
}
