//! The run context handed to every plugin constructor, and the error policy
//! behind its error-reporting capability.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, warn};

use nutra_core::config::{ResolvedConfig, RunConfig};
use nutra_core::error::NutraError;
use nutra_core::result::NutraResult;
use nutra_core::traits::workspace::WorkspaceFs;

use crate::hooks::definitions::PluginKind;
use crate::hooks::scheduler::{settle_all, start};
use crate::hooks::sets::{FrameworkExecutionHook, HookFuture};
use crate::preprocess::PreprocessorChain;
use crate::registry::PluginInstances;

/// Routes failures: warnings are logged, everything else removes the
/// working directory and is raised.
#[derive(Debug, Clone)]
pub struct ErrorPolicy {
    fs: Arc<dyn WorkspaceFs>,
    working_dir: PathBuf,
}

impl ErrorPolicy {
    /// Creates a policy guarding `working_dir`.
    pub fn new(fs: Arc<dyn WorkspaceFs>, working_dir: PathBuf) -> Self {
        Self { fs, working_dir }
    }

    /// The directory removed on fatal reports.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Removes the working directory. Failures are logged, never raised.
    pub async fn cleanup(&self) {
        match self.fs.remove_dir(&self.working_dir).await {
            Ok(()) => debug!(working_dir = %self.working_dir.display(), "Working directory removed"),
            Err(e) => warn!(
                working_dir = %self.working_dir.display(),
                error = %e,
                "Failed to remove working directory"
            ),
        }
    }

    /// Reports a failure.
    ///
    /// A non-fatal warning is logged with its message only and the run goes
    /// on. Anything else removes the working directory and comes back as
    /// `Err`; a fatal warning is raised without its cause chain.
    pub async fn report(&self, error: NutraError, warning: bool, fatal: bool) -> NutraResult<()> {
        match (warning, fatal) {
            (true, false) => {
                warn!(error = %error, "Warning reported");
                Ok(())
            }
            (true, true) => {
                warn!(error = %error, "Fatal warning reported");
                self.cleanup().await;
                Err(error.clone())
            }
            (false, _) => Err(self.fail(error).await),
        }
    }

    /// Logs the full diagnostic, removes the working directory and hands the
    /// error back for raising.
    pub async fn fail(&self, error: NutraError) -> NutraError {
        error!(kind = %error.kind, "{}", error.diagnostic());
        self.cleanup().await;
        error
    }
}

/// Callbacks the context forwards to once plugins are instantiated.
pub(crate) struct ContextDispatch {
    chain: PreprocessorChain,
    reporters: Vec<(String, FrameworkExecutionHook)>,
}

impl ContextDispatch {
    pub(crate) fn new(chain: PreprocessorChain, instances: &PluginInstances) -> Self {
        let reporters = instances
            .of_kind(PluginKind::Reporter)
            .iter()
            .filter_map(|instance| {
                instance
                    .hooks
                    .framework_execution()
                    .map(|hook| (instance.name.clone(), hook))
            })
            .collect();
        Self { chain, reporters }
    }
}

impl fmt::Debug for ContextDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reporters: Vec<&str> = self.reporters.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ContextDispatch")
            .field("chain", &self.chain)
            .field("reporters", &reporters)
            .finish()
    }
}

#[derive(Debug)]
struct ContextInner {
    config: RunConfig,
    files: Vec<PathBuf>,
    policy: ErrorPolicy,
    dispatch: RwLock<Option<Arc<ContextDispatch>>>,
}

/// Read-only view of a run shared by all plugins.
///
/// Cloning is cheap; every clone refers to the same run.
#[derive(Debug, Clone)]
pub struct RunContext {
    inner: Arc<ContextInner>,
}

impl RunContext {
    /// Creates the context of a run.
    pub fn new(resolved: ResolvedConfig, policy: ErrorPolicy) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                config: resolved.config,
                files: resolved.files,
                policy,
                dispatch: RwLock::new(None),
            }),
        }
    }

    /// The validated configuration.
    pub fn config(&self) -> &RunConfig {
        &self.inner.config
    }

    /// Expanded absolute file list.
    pub fn files(&self) -> &[PathBuf] {
        &self.inner.files
    }

    /// Resolved base path.
    pub fn base_path(&self) -> &Path {
        self.inner.config.base_path()
    }

    /// Whether patterns were used as written.
    pub fn absolute_paths(&self) -> bool {
        self.inner.config.absolute_paths
    }

    /// The run's transient working directory.
    pub fn working_dir(&self) -> &Path {
        self.inner.policy.working_dir()
    }

    /// Routes a failure through the run's error policy.
    ///
    /// Returns `Ok` only for non-fatal warnings. Otherwise the working
    /// directory is gone by the time the error comes back; a hook should
    /// return it to abort the run.
    pub async fn report_error(
        &self,
        error: NutraError,
        warning: bool,
        fatal: bool,
    ) -> NutraResult<()> {
        self.inner.policy.report(error, warning, fatal).await
    }

    /// Runs `source` through the preprocessors owning `filename` and returns
    /// the source to use.
    pub async fn on_file_source_loaded(
        &self,
        source: String,
        filename: impl Into<String>,
        key: impl Into<String>,
    ) -> NutraResult<String> {
        match self.dispatch() {
            Some(dispatch) => dispatch.chain.apply(source, filename.into(), key.into()).await,
            None => Ok(source),
        }
    }

    /// Tells every reporter that `framework` executed.
    ///
    /// All reporter hooks settle before the first failure is returned.
    pub async fn on_framework_execution(&self, framework: impl Into<String>) -> NutraResult<()> {
        let Some(dispatch) = self.dispatch() else {
            return Ok(());
        };
        let framework = framework.into();
        let tasks: Vec<(String, HookFuture)> = dispatch
            .reporters
            .iter()
            .map(|(name, hook)| (name.clone(), start(|| hook(framework.clone()))))
            .collect();
        debug!(framework = %framework, reporters = tasks.len(), "Framework execution announced");
        settle_all("onFrameworkExecution:reporters", tasks).await
    }

    pub(crate) fn install(&self, dispatch: ContextDispatch) {
        let mut slot = self
            .inner
            .dispatch
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(dispatch));
    }

    /// Drops the installed hooks once the run settled.
    pub(crate) fn release(&self) {
        let mut slot = self
            .inner
            .dispatch
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.take();
    }

    fn dispatch(&self) -> Option<Arc<ContextDispatch>> {
        self.inner
            .dispatch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
