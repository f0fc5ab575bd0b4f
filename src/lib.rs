//! muassets - Asset manifest compiler
//!
//! This library provides functionality to:
//! - Resolve asset manifests and their imports into ordered file lists
//! - Parse asset contents as JSON or XML and classify them by structure
//! - Generate a JavaScript registry module describing every asset
//! - Report every file read so host builds can track dependencies

pub mod build;
pub mod classify;
pub mod cli;
pub mod config;
pub mod content;
pub mod logging;
pub mod manifest;
pub mod registry;
