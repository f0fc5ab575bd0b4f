//! Configuration module for muassets
//!
//! Provides types and parsing for `mua.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
