//! Parsing and validation of `snaptrace.toml` configuration files.
//!
//! This crate reads the sampling configuration and produces a strongly-typed
//! [`SnapConfig`]: sampling policy and pool size, scan chain control
//! registers, and the register layout of the external interface trace.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_paths, ResolvedPaths};
pub use types::*;
