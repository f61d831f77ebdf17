//! Core traits defined in `nutra-core` and implemented by callers.

pub mod workspace;

pub use workspace::WorkspaceFs;
