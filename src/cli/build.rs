//! Build command implementation

use std::path::PathBuf;
use std::process::ExitCode;

use super::{check_manifest, ManifestArgs, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildPipeline};
use crate::config::CliOverrides;

/// Run the build command
pub fn run_build(
    args: &ManifestArgs,
    overrides: &CliOverrides,
    output: Option<PathBuf>,
    depfile: Option<PathBuf>,
    root: Option<PathBuf>,
) -> ExitCode {
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

    let mut context = context.with_output(output).with_depfile(depfile);
    if let Some(root) = root {
        context = context.with_root(root);
    }

    let to_stdout = context.output().is_none();
    match BuildPipeline::new(context).build() {
        Ok(result) => {
            if to_stdout {
                print!("{}", result.source);
                log::info!("{}", result.summary());
            } else {
                println!("{}", result.summary());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
