//! Asset file discovery.
//!
//! Expands a manifest's include patterns relative to its working directory
//! and filters the matches through its exclude patterns. Results keep the
//! order the patterns were listed in and the order `glob` walks each pattern;
//! nothing is sorted or deduplicated, so overlapping patterns list a file
//! more than once.

use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error during file discovery.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// Invalid include or exclude pattern
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// A path could not be read while expanding a pattern
    #[error("Error expanding '{pattern}' at '{}': {}", .source.path().display(), .source.error())]
    Walk {
        pattern: String,
        #[source]
        source: glob::GlobError,
    },
}

impl DiscoveryError {
    /// The pattern that failed.
    pub fn pattern(&self) -> &str {
        match self {
            DiscoveryError::InvalidPattern { pattern, .. } => pattern,
            DiscoveryError::Walk { pattern, .. } => pattern,
        }
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Anchor a pattern at the working directory unless it is absolute.
///
/// The directory part is escaped so brackets or asterisks in real directory
/// names are not treated as wildcards.
fn anchor(pattern: &str, working_dir: &Path) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let dir = Pattern::escape(&working_dir.to_string_lossy());
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    if dir.is_empty() {
        pattern.to_string()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, pattern)
    } else {
        format!("{}/{}", dir, pattern)
    }
}

/// Compiled exclude patterns.
#[derive(Debug, Default)]
pub struct ExcludeFilter {
    patterns: Vec<Pattern>,
}

impl ExcludeFilter {
    /// Compile exclude patterns relative to a working directory.
    pub fn new(excludes: &[String], working_dir: &Path) -> Result<Self, DiscoveryError> {
        let patterns = excludes
            .iter()
            .map(|exclude| {
                Pattern::new(&anchor(exclude, working_dir)).map_err(|source| {
                    DiscoveryError::InvalidPattern { pattern: exclude.clone(), source }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True if the path matches any exclude pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches_path_with(path, MATCH_OPTIONS))
    }
}

/// Expand a single include pattern into regular files.
pub fn expand_pattern(
    pattern: &str,
    working_dir: &Path,
    filter: &ExcludeFilter,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let anchored = anchor(pattern, working_dir);
    let paths = glob::glob_with(&anchored, MATCH_OPTIONS).map_err(|source| {
        DiscoveryError::InvalidPattern { pattern: pattern.to_string(), source }
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path =
            entry.map_err(|source| DiscoveryError::Walk { pattern: pattern.to_string(), source })?;
        if path.is_file() && !filter.is_excluded(&path) {
            files.push(path);
        }
    }

    log::trace!("{}: {} file(s)", anchored, files.len());
    Ok(files)
}

/// Discover asset files for a manifest.
///
/// Include patterns expand concurrently; results are concatenated in pattern
/// order. The first failing pattern fails the whole discovery.
pub fn discover(
    includes: &[String],
    excludes: &[String],
    working_dir: &Path,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let filter = ExcludeFilter::new(excludes, working_dir)?;

    let groups = includes
        .par_iter()
        .map(|pattern| expand_pattern(pattern, working_dir, &filter))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(groups.into_iter().flatten().collect())
}
