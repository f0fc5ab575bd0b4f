//! Deps command implementation

use std::process::ExitCode;

use super::{check_manifest, ManifestArgs, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildPipeline};
use crate::config::CliOverrides;

/// Run the deps command
///
/// Prints one dependency per line. When resolution fails, the files read up
/// to the failure are still printed before the error is reported.
pub fn run_deps(args: &ManifestArgs, overrides: &CliOverrides) -> ExitCode {
    if let Err(code) = check_manifest(&args.manifest) {
        return code;
    }

    let context = match BuildContext::load(args.manifest.clone(), args.config.as_deref(), overrides) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match BuildPipeline::new(context).dependencies() {
        Ok(dependencies) => {
            for dependency in dependencies {
                println!("{}", dependency.display());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            for dependency in e.dependencies().into_iter().flatten() {
                println!("{}", dependency.display());
            }
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
