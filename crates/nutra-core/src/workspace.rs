//! Local working-directory management.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ErrorKind, NutraError};
use crate::result::NutraResult;
use crate::traits::workspace::WorkspaceFs;

/// Attempts at finding an unused working-directory name.
const MAX_NAME_ATTEMPTS: usize = 16;

/// [`WorkspaceFs`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalWorkspaceFs;

#[async_trait]
impl WorkspaceFs for LocalWorkspaceFs {
    async fn create_dir(&self, path: &Path) -> NutraResult<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            NutraError::with_source(
                ErrorKind::Workspace,
                format!("Failed to create directory: {}", path.display()),
                e,
            )
        })
    }

    async fn remove_dir(&self, path: &Path) -> NutraResult<()> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NutraError::with_source(
                ErrorKind::Workspace,
                format!("Failed to remove directory: {}", path.display()),
                e,
            )),
        }
    }

    async fn exists(&self, path: &Path) -> NutraResult<bool> {
        fs::try_exists(path).await.map_err(|e| {
            NutraError::with_source(
                ErrorKind::Workspace,
                format!("Failed to inspect path: {}", path.display()),
                e,
            )
        })
    }
}

/// Default parent of working directories: `<system temp>/nutra`.
pub fn default_temp_root() -> PathBuf {
    std::env::temp_dir().join("nutra")
}

/// Picks a `run-<uuid>` path under `parent` that does not exist yet.
///
/// Nothing is created; the caller creates the directory.
pub async fn unique_dir(fs: &dyn WorkspaceFs, parent: &Path) -> NutraResult<PathBuf> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let candidate = parent.join(format!("run-{}", Uuid::now_v7().simple()));
        if !fs.exists(&candidate).await? {
            debug!(path = %candidate.display(), "Working directory name chosen");
            return Ok(candidate);
        }
    }
    Err(NutraError::workspace(format!(
        "No unused working directory name found under {}",
        parent.display()
    )))
}
