//! `nutra-stage`: the default module loader.
//!
//! Reads every file of the run, passes it through the preprocessor chain
//! and writes the result into the working directory, keyed by its path
//! relative to the base path.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use nutra_core::error::{ErrorKind, NutraError};
use nutra_core::result::NutraResult;

use crate::context::RunContext;
use crate::exports::PluginExport;
use crate::hooks::sets::{ModuleLoaderHooks, lifecycle_hook};

/// Registered name of the loader.
pub const NAME: &str = "nutra-stage";

/// The loader's plugin module.
pub fn module() -> PluginExport {
    PluginExport::new().module_loader(construct)
}

fn construct(hooks: &mut ModuleLoaderHooks, ctx: &RunContext, options: &Value) -> NutraResult<()> {
    let target = match options.get("subdir") {
        None | Some(Value::Null) => ctx.working_dir().to_path_buf(),
        Some(Value::String(subdir)) => ctx.working_dir().join(staging_subdir(subdir)?),
        Some(other) => {
            return Err(NutraError::configuration(format!(
                "Option 'stageOptions.subdir' must be a string, received: {other}"
            )));
        }
    };

    let stage = Arc::new(Stage {
        ctx: ctx.clone(),
        target,
        staged: AtomicUsize::new(0),
    });

    let loading = Arc::clone(&stage);
    hooks.on_load = Some(lifecycle_hook(move || {
        let stage = Arc::clone(&loading);
        async move { stage.load_all().await }
    }));

    let exiting = stage;
    hooks.on_exit = Some(lifecycle_hook(move || {
        let stage = Arc::clone(&exiting);
        async move {
            info!(
                staged = stage.staged.load(Ordering::Relaxed),
                target = %stage.target.display(),
                "Sources staged"
            );
            Ok(())
        }
    }));

    Ok(())
}

/// `subdir` must stay inside the working directory.
fn staging_subdir(subdir: &str) -> NutraResult<&Path> {
    let path = Path::new(subdir);
    let contained = path
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if contained {
        Ok(path)
    } else {
        Err(NutraError::configuration(format!(
            "Option 'stageOptions.subdir' must be a relative path inside the working directory, received: {subdir}"
        )))
    }
}

struct Stage {
    ctx: RunContext,
    target: PathBuf,
    staged: AtomicUsize,
}

impl Stage {
    async fn load_all(&self) -> NutraResult<()> {
        for file in self.ctx.files() {
            self.load(file).await?;
        }
        Ok(())
    }

    async fn load(&self, file: &Path) -> NutraResult<()> {
        let source = fs::read_to_string(file).await.map_err(|e| {
            NutraError::with_source(
                ErrorKind::Workspace,
                format!("Failed to read source file: {}", file.display()),
                e,
            )
        })?;

        let key = stage_key(file, self.ctx.base_path());
        let filename = file.to_string_lossy().into_owned();
        let staged = self
            .ctx
            .on_file_source_loaded(source, filename, key.clone())
            .await?;

        let destination = self.target.join(&key);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&destination, staged).await.map_err(|e| {
            NutraError::with_source(
                ErrorKind::Workspace,
                format!("Failed to stage file: {}", destination.display()),
                e,
            )
        })?;

        self.staged.fetch_add(1, Ordering::Relaxed);
        debug!(file = %file.display(), key = %key, "File staged");
        Ok(())
    }
}

/// `file` relative to `base_path`, `/`-separated. Files outside the base
/// path keep their full path minus the root.
pub fn stage_key(file: &Path, base_path: &Path) -> String {
    let relative = file.strip_prefix(base_path).unwrap_or(file);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
