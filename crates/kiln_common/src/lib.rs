//! Shared foundational types used across the kiln build cache.
//!
//! This crate provides the [`ContentHash`] digest that every cache key is
//! built from, the cache profile and output type that distinguish build
//! variants, and the error classification shared by all kiln crates.

#![warn(missing_docs)]

pub mod error;
pub mod fs;
pub mod hash;
pub mod profile;

pub use error::{ErrorKind, FatalError, InternalError, KilnResult};
pub use fs::{FileSystem, LocalFileSystem};
pub use hash::{ContentHash, ParseHashError};
pub use profile::{CacheOutputType, CacheProfile, ParseOutputTypeError};
