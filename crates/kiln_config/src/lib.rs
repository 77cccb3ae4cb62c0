//! Parsing and validation of `kiln.toml` cache configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`KilnConfig`], and resolves the [`CacheProfile`](kiln_common::CacheProfile)
//! a hashing or warming run uses.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_profile, DEFAULT_PROFILE};
pub use types::*;
