//! Lifecycle scheduler: drives the phase sequence over the instantiated
//! plugins.
//!
//! Within a phase every hook starts at once and the phase completes only
//! after all of them settled. A hook that fails or panics does not cancel
//! its siblings; once the phase settled, the first failure in registration
//! order aborts the remaining phases.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, error, info};

use nutra_core::error::{ErrorKind, NutraError};
use nutra_core::result::NutraResult;

use super::definitions::{DEFAULT_PHASES, LifecyclePhase};
use super::sets::HookFuture;
use crate::registry::PluginInstances;

/// Runs lifecycle phases in a fixed order.
#[derive(Debug, Clone)]
pub struct HookScheduler {
    /// Phase sequence.
    phases: Vec<LifecyclePhase>,
}

impl Default for HookScheduler {
    fn default() -> Self {
        Self {
            phases: DEFAULT_PHASES.to_vec(),
        }
    }
}

impl HookScheduler {
    /// Creates a scheduler with a custom phase sequence.
    ///
    /// Only `onLoad` and `onExit` can be scheduled; a phase must name an
    /// event its kind supports.
    pub fn with_phases(phases: impl IntoIterator<Item = LifecyclePhase>) -> NutraResult<Self> {
        let phases: Vec<LifecyclePhase> = phases.into_iter().collect();
        for phase in &phases {
            if !phase.event.is_lifecycle() || !phase.event.supported_by(phase.kind) {
                return Err(NutraError::configuration(format!(
                    "Phase '{phase}' cannot be scheduled"
                )));
            }
        }
        Ok(Self { phases })
    }

    /// Returns the phase sequence.
    pub fn phases(&self) -> &[LifecyclePhase] {
        &self.phases
    }

    /// Runs every phase in order and returns the phases that completed.
    ///
    /// Stops at the first phase that fails.
    pub async fn run(&self, instances: &PluginInstances) -> NutraResult<Vec<LifecyclePhase>> {
        let mut completed = Vec::with_capacity(self.phases.len());
        for phase in &self.phases {
            self.run_phase(*phase, instances).await?;
            completed.push(*phase);
        }
        info!(phases = completed.len(), "Lifecycle completed");
        Ok(completed)
    }

    /// Runs one phase and returns how many hooks were invoked.
    pub async fn run_phase(
        &self,
        phase: LifecyclePhase,
        instances: &PluginInstances,
    ) -> NutraResult<usize> {
        let tasks: Vec<(String, HookFuture)> = instances
            .of_kind(phase.kind)
            .iter()
            .filter_map(|instance| {
                instance
                    .hooks
                    .lifecycle(phase.event)
                    .map(|hook| (instance.name.clone(), start(|| hook())))
            })
            .collect();

        let invoked = tasks.len();
        debug!(phase = %phase, hook_count = invoked, "Running phase");
        settle_all(&phase.to_string(), tasks).await?;
        Ok(invoked)
    }
}

/// Calls `hook` for its future. A panic raised before the future exists is
/// deferred into the returned future, so it settles like any other panic.
pub(crate) fn start<T: Send + 'static>(hook: impl FnOnce() -> HookFuture<T>) -> HookFuture<T> {
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(future) => future,
        Err(payload) => async move { rethrow(payload) }.boxed(),
    }
}

fn rethrow<T>(payload: Box<dyn Any + Send>) -> NutraResult<T> {
    panic::resume_unwind(payload)
}

/// Awaits every hook future and surfaces the first failure.
///
/// Panics are caught and reported like rejections.
pub(crate) async fn settle_all(label: &str, tasks: Vec<(String, HookFuture)>) -> NutraResult<()> {
    if tasks.is_empty() {
        return Ok(());
    }

    let (names, futures): (Vec<String>, Vec<HookFuture>) = tasks.into_iter().unzip();
    let outcomes = join_all(
        futures
            .into_iter()
            .map(|fut| AssertUnwindSafe(fut).catch_unwind()),
    )
    .await;

    let mut first_failure = None;
    for (name, outcome) in names.into_iter().zip(outcomes) {
        let failure = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => NutraError::with_source(
                ErrorKind::HookExecution,
                format!("Plugin '{name}' failed during {label}: {}", err.message),
                err,
            ),
            Err(panic) => NutraError::hook_execution(format!(
                "Plugin '{name}' panicked during {label}: {}",
                panic_message(panic.as_ref())
            )),
        };
        error!(hook = %label, plugin = %name, error = %failure, "Hook failed");
        if first_failure.is_none() {
            first_failure = Some(failure);
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
