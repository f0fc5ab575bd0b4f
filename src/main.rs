//! mua - Command-line tool for compiling asset manifests into registry modules

use std::process::ExitCode;

use muassets::cli;

fn main() -> ExitCode {
    cli::run()
}
