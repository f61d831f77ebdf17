//! Lifecycle controller: owns the run's working directory and wraps the
//! hook lifecycle with setup, teardown and the error policy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use nutra_core::config::{self, ConfigInput};
use nutra_core::result::NutraResult;
use nutra_core::traits::workspace::WorkspaceFs;
use nutra_core::workspace::{LocalWorkspaceFs, default_temp_root, unique_dir};

use crate::context::{ContextDispatch, ErrorPolicy, RunContext};
use crate::hooks::definitions::{LifecyclePhase, PluginKind};
use crate::hooks::scheduler::HookScheduler;
use crate::preprocess::{PreprocessorChain, PreprocessorFilter};
use crate::registry::{PluginRegistry, PluginResolver};

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Number of files in the run.
    pub files: usize,
    /// Number of instantiated plugins.
    pub plugins: usize,
    /// Phases that ran, in order.
    pub phases: Vec<LifecyclePhase>,
    /// Working directory the run used. It no longer exists.
    pub working_dir: PathBuf,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Drives complete runs.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: PluginRegistry,
    scheduler: HookScheduler,
    fs: Arc<dyn WorkspaceFs>,
    temp_root: PathBuf,
}

impl Orchestrator {
    /// Creates an orchestrator resolving plugins through `resolver`, with the
    /// default phase order and the local filesystem.
    pub fn new(resolver: Arc<dyn PluginResolver>) -> Self {
        Self {
            registry: PluginRegistry::new(resolver),
            scheduler: HookScheduler::default(),
            fs: Arc::new(LocalWorkspaceFs),
            temp_root: default_temp_root(),
        }
    }

    /// Replaces the phase order.
    pub fn with_scheduler(mut self, scheduler: HookScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replaces the filesystem used for the working directory.
    pub fn with_workspace_fs(mut self, fs: Arc<dyn WorkspaceFs>) -> Self {
        self.fs = fs;
        self
    }

    /// Replaces the parent directory of working directories.
    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    /// Parent directory of working directories.
    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Runs one configuration end to end.
    ///
    /// Validation failures return before a working directory exists. Any
    /// later failure removes the working directory before it is returned.
    pub async fn run(&self, input: impl Into<ConfigInput>) -> NutraResult<RunSummary> {
        let started_at = Utc::now();

        let resolved = config::resolve(input).inspect_err(|e| {
            error!(kind = %e.kind, "{}", e.diagnostic());
        })?;

        let working_dir = unique_dir(self.fs.as_ref(), &self.temp_root)
            .await
            .inspect_err(|e| error!(kind = %e.kind, "{}", e.diagnostic()))?;
        let policy = ErrorPolicy::new(Arc::clone(&self.fs), working_dir.clone());
        if let Err(e) = self.fs.create_dir(&working_dir).await {
            return Err(policy.fail(e).await);
        }

        info!(
            working_dir = %working_dir.display(),
            files = resolved.files.len(),
            "Run started"
        );

        let files = resolved.files.len();
        let ctx = RunContext::new(resolved, policy.clone());
        let outcome = self.execute(&ctx).await;
        ctx.release();

        match outcome {
            Ok((plugins, phases)) => {
                policy.cleanup().await;
                let finished_at = Utc::now();
                info!(
                    plugins,
                    phases = phases.len(),
                    elapsed_ms = (finished_at - started_at).num_milliseconds(),
                    "Run finished"
                );
                Ok(RunSummary {
                    files,
                    plugins,
                    phases,
                    working_dir,
                    started_at,
                    finished_at,
                })
            }
            Err(e) => Err(policy.fail(e).await),
        }
    }

    async fn execute(&self, ctx: &RunContext) -> NutraResult<(usize, Vec<LifecyclePhase>)> {
        let filter = PreprocessorFilter::from_config(ctx.config())?;
        let instances = self.registry.load_all(ctx, &filter)?;

        let chain = PreprocessorChain::new(instances.of_kind(PluginKind::Preprocessor), &filter);
        info!(
            plugins = instances.count(),
            chained_preprocessors = chain.len(),
            "Plugins instantiated"
        );
        ctx.install(ContextDispatch::new(chain, &instances));

        let phases = self.scheduler.run(&instances).await?;
        Ok((instances.count(), phases))
    }
}
