//! Classify command implementation

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::classify::{classify, AssetKind};
use crate::content::{ContentParser, RawFile};
use crate::registry::asset_key;

#[derive(Serialize)]
struct ClassifyLine<'a> {
    path: &'a Path,
    key: String,
    kind: AssetKind,
}

/// Run the classify command
pub fn run_classify(files: &[PathBuf], json: bool) -> ExitCode {
    let mut failed = false;

    for path in files {
        let raw = match RawFile::read(path) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("Error: Failed to read '{}': {}", path.display(), e);
                failed = true;
                continue;
            }
        };
        let asset = classify(ContentParser::parse_file(raw));

        if json {
            let line = ClassifyLine { path, key: asset_key(path), kind: asset.kind() };
            match serde_json::to_string(&line) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    failed = true;
                }
            }
        } else {
            println!("{:<12} {}", asset.kind().as_str(), path.display());
        }
    }

    if failed {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}
