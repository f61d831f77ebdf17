//! Convenience result type alias for Nutra.

use crate::error::NutraError;

/// A specialized `Result` type for Nutra operations.
pub type NutraResult<T> = Result<T, NutraError>;
