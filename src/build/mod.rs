//! Build pipeline module for muassets
//!
//! Turns an asset manifest into a generated registry module.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Resolution**: Parse the manifest and resolve its imports recursively
//! - **Discovery**: Find asset files using the manifest's glob patterns
//! - **Emission**: Classify every file and generate the registry source
//!
//! # Example
//!
//! ```ignore
//! use muassets::build::{BuildContext, BuildPipeline};
//! use muassets::config::CliOverrides;
//!
//! let context = BuildContext::load(manifest, None, &CliOverrides::default())?;
//! let result = BuildPipeline::new(context).build()?;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod depfile;
pub mod discovery;
pub mod pipeline;
pub mod resolve;
pub mod result;

pub use context::*;
pub use depfile::*;
pub use discovery::*;
pub use pipeline::*;
pub use resolve::*;
pub use result::*;
