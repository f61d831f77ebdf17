//! # nutra-core
//!
//! Core crate for Nutra. Contains the unified error system, the run
//! configuration normalizer, the glob resolver, and the filesystem
//! capability used to manage a run's transient working directory.
//!
//! This crate has **no** internal dependencies on other Nutra crates.

pub mod config;
pub mod error;
pub mod glob;
pub mod result;
pub mod traits;
pub mod workspace;

pub use config::{ConfigInput, PreprocessorRule, ResolvedConfig, RunConfig};
pub use error::{ErrorKind, NutraError};
pub use result::NutraResult;
