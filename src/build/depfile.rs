//! Make-style dependency files.
//!
//! Written next to the generated module so build systems that understand
//! depfiles (make, ninja) rerun `mua` when any file it read changes:
//!
//! ```text
//! assets.js: assets.json sprites/walk.json maps/level\ 1.tmx
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Escape a path for use in a Make rule.
pub fn escape_path(path: &Path) -> String {
    let text = path.to_string_lossy();
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => escaped.push_str("\\ "),
            '#' => escaped.push_str("\\#"),
            '$' => escaped.push_str("$$"),
            '\\' => escaped.push('/'),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render a depfile rule for `target`.
pub fn render_depfile<'a>(target: &Path, dependencies: impl IntoIterator<Item = &'a PathBuf>) -> String {
    let mut rule = format!("{}:", escape_path(target));
    for dependency in dependencies {
        rule.push(' ');
        rule.push_str(&escape_path(dependency));
    }
    rule.push('\n');
    rule
}

/// Write a depfile, creating its parent directory if needed.
pub fn write_depfile<'a>(
    path: &Path,
    target: &Path,
    dependencies: impl IntoIterator<Item = &'a PathBuf>,
) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_depfile(target, dependencies))
}
