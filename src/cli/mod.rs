//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod classify;
mod deps;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::CliOverrides;
use crate::manifest::Dialect;
use crate::registry::ModuleFormat;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// mua - Compile asset manifests into generated registry modules
#[derive(Parser)]
#[command(name = "mua")]
#[command(about = "mua - Compile asset manifests into generated registry modules")]
#[command(version)]
pub struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by commands that resolve a manifest
#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Root manifest file
    pub manifest: PathBuf,

    /// Config file (default: nearest mua.toml at or above the manifest)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Manifest dialect (overrides [manifest] dialect)
    #[arg(long, value_enum)]
    pub dialect: Option<Dialect>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the registry module for a manifest
    Build {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Module format (overrides [output] format)
        #[arg(long, value_enum)]
        format: Option<ModuleFormat>,

        /// Write a Make-style depfile listing every file read
        #[arg(long)]
        depfile: Option<PathBuf>,

        /// Directory generated paths are relative to (default: manifest directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Fail when two assets derive the same key
        #[arg(long)]
        strict_keys: bool,

        /// Export the plain registry literal even if [runtime] is configured
        #[arg(long)]
        no_runtime: bool,
    },

    /// List every file a manifest depends on, one per line
    Deps {
        #[command(flatten)]
        manifest: ManifestArgs,
    },

    /// Show the kind each file would be registered as
    Classify {
        /// Files to classify
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Check that the root manifest names an existing file.
pub(crate) fn check_manifest(path: &Path) -> Result<(), ExitCode> {
    if path.is_file() {
        return Ok(());
    }
    eprintln!("Error: Manifest not found: {}", path.display());
    Err(ExitCode::from(EXIT_INVALID_ARGS))
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = crate::logging::init(crate::logging::level_for(cli.verbose, cli.quiet)) {
        eprintln!("Warning: could not initialize logging: {}", e);
    }

    match cli.command {
        Commands::Build { manifest, output, format, depfile, root, strict_keys, no_runtime } => {
            let overrides = CliOverrides {
                dialect: manifest.dialect,
                format,
                on_collision: strict_keys.then_some(crate::registry::CollisionPolicy::Error),
                no_runtime,
            };
            build::run_build(&manifest, &overrides, output, depfile, root)
        }
        Commands::Deps { manifest } => {
            let overrides = CliOverrides { dialect: manifest.dialect, ..Default::default() };
            deps::run_deps(&manifest, &overrides)
        }
        Commands::Classify { files, json } => classify::run_classify(&files, json),
    }
}
