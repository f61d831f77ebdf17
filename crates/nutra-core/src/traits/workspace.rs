//! Filesystem capability behind a run's transient working directory.

use std::path::Path;

use async_trait::async_trait;

use crate::result::NutraResult;

/// Directory operations the lifecycle controller needs.
///
/// The local implementation is [`crate::workspace::LocalWorkspaceFs`];
/// tests substitute their own to observe or fail these calls.
#[async_trait]
pub trait WorkspaceFs: Send + Sync + std::fmt::Debug + 'static {
    /// Create a directory and any missing parents. Succeeds if it exists.
    async fn create_dir(&self, path: &Path) -> NutraResult<()>;

    /// Remove a directory and everything below it. Succeeds if it is absent.
    async fn remove_dir(&self, path: &Path) -> NutraResult<()>;

    /// Check whether a file or directory exists at the given path.
    async fn exists(&self, path: &Path) -> NutraResult<bool>;
}
