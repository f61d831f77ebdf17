//! Per-kind hook sets.
//!
//! Each plugin instance owns exactly one set. The slots are fixed by the
//! plugin kind: a plugin fills the slots it cares about from its
//! constructor and cannot add new ones.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use nutra_core::result::NutraResult;

use super::definitions::{FileLoadOutcome, FileSource, HookEvent, PluginKind};

/// Future returned by every hook.
pub type HookFuture<T = ()> = BoxFuture<'static, NutraResult<T>>;

/// `onLoad` / `onExit` callback.
pub type LifecycleHook = Arc<dyn Fn() -> HookFuture + Send + Sync>;

/// `onFileLoad` callback of a preprocessor.
pub type FileLoadHook = Arc<dyn Fn(FileSource) -> HookFuture<FileLoadOutcome> + Send + Sync>;

/// `onFrameworkExecution` callback of a reporter; receives the framework id.
pub type FrameworkExecutionHook = Arc<dyn Fn(String) -> HookFuture + Send + Sync>;

/// Wraps an async closure into a [`LifecycleHook`].
pub fn lifecycle_hook<F, Fut>(hook: F) -> LifecycleHook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = NutraResult<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(hook()))
}

/// Wraps an async closure into a [`FileLoadHook`].
///
/// The closure may resolve to anything convertible into a
/// [`FileLoadOutcome`]: a `String` replaces the source, a
/// [`FileRewrite`](super::definitions::FileRewrite) replaces the fields it
/// sets, `()` leaves the triple unchanged.
pub fn file_load_hook<F, Fut, O>(hook: F) -> FileLoadHook
where
    F: Fn(FileSource) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = NutraResult<O>> + Send + 'static,
    O: Into<FileLoadOutcome> + 'static,
{
    let hook = Arc::new(hook);
    Arc::new(move |file| {
        let fut = hook(file);
        Box::pin(async move { fut.await.map(Into::into) })
    })
}

/// Wraps an async closure into a [`FrameworkExecutionHook`].
pub fn framework_execution_hook<F, Fut>(hook: F) -> FrameworkExecutionHook
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = NutraResult<()>> + Send + 'static,
{
    Arc::new(move |framework| Box::pin(hook(framework)))
}

fn slot<T>(hook: &Option<T>) -> &'static str {
    if hook.is_some() { "<hook>" } else { "null" }
}

/// Hooks of a module loader.
#[derive(Clone, Default)]
pub struct ModuleLoaderHooks {
    /// Called during `onLoad:moduleloader`.
    pub on_load: Option<LifecycleHook>,
    /// Called during `onExit:moduleloader`.
    pub on_exit: Option<LifecycleHook>,
}

/// Hooks of a preprocessor.
#[derive(Clone, Default)]
pub struct PreprocessorHooks {
    /// Called during `onLoad:preprocessors`.
    pub on_load: Option<LifecycleHook>,
    /// Called during `onExit:preprocessors`.
    pub on_exit: Option<LifecycleHook>,
    /// Called for every owned file a module loader reads.
    pub on_file_load: Option<FileLoadHook>,
}

/// Hooks of a framework.
#[derive(Clone, Default)]
pub struct FrameworkHooks {
    /// Called during `onLoad:frameworks`.
    pub on_load: Option<LifecycleHook>,
    /// Called during `onExit:frameworks`.
    pub on_exit: Option<LifecycleHook>,
}

/// Hooks of a reporter.
#[derive(Clone, Default)]
pub struct ReporterHooks {
    /// Called during `onLoad:reporters`.
    pub on_load: Option<LifecycleHook>,
    /// Called during `onExit:reporters`.
    pub on_exit: Option<LifecycleHook>,
    /// Called whenever a framework announces its execution.
    pub on_framework_execution: Option<FrameworkExecutionHook>,
}

impl fmt::Debug for ModuleLoaderHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoaderHooks")
            .field("on_load", &slot(&self.on_load))
            .field("on_exit", &slot(&self.on_exit))
            .finish()
    }
}

impl fmt::Debug for PreprocessorHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessorHooks")
            .field("on_load", &slot(&self.on_load))
            .field("on_exit", &slot(&self.on_exit))
            .field("on_file_load", &slot(&self.on_file_load))
            .finish()
    }
}

impl fmt::Debug for FrameworkHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameworkHooks")
            .field("on_load", &slot(&self.on_load))
            .field("on_exit", &slot(&self.on_exit))
            .finish()
    }
}

impl fmt::Debug for ReporterHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterHooks")
            .field("on_load", &slot(&self.on_load))
            .field("on_exit", &slot(&self.on_exit))
            .field("on_framework_execution", &slot(&self.on_framework_execution))
            .finish()
    }
}

/// The hook set of one plugin instance, tagged by kind.
#[derive(Debug, Clone)]
pub enum HookSet {
    /// Module loader slots.
    ModuleLoader(ModuleLoaderHooks),
    /// Preprocessor slots.
    Preprocessor(PreprocessorHooks),
    /// Framework slots.
    Framework(FrameworkHooks),
    /// Reporter slots.
    Reporter(ReporterHooks),
}

impl HookSet {
    /// Returns the kind the set belongs to.
    pub fn kind(&self) -> PluginKind {
        match self {
            Self::ModuleLoader(_) => PluginKind::ModuleLoader,
            Self::Preprocessor(_) => PluginKind::Preprocessor,
            Self::Framework(_) => PluginKind::Framework,
            Self::Reporter(_) => PluginKind::Reporter,
        }
    }

    /// Returns the `onLoad` or `onExit` hook, if installed.
    pub fn lifecycle(&self, event: HookEvent) -> Option<LifecycleHook> {
        let (on_load, on_exit) = match self {
            Self::ModuleLoader(h) => (&h.on_load, &h.on_exit),
            Self::Preprocessor(h) => (&h.on_load, &h.on_exit),
            Self::Framework(h) => (&h.on_load, &h.on_exit),
            Self::Reporter(h) => (&h.on_load, &h.on_exit),
        };
        match event {
            HookEvent::OnLoad => on_load.clone(),
            HookEvent::OnExit => on_exit.clone(),
            HookEvent::OnFileLoad | HookEvent::OnFrameworkExecution => None,
        }
    }

    /// Returns the `onFileLoad` hook of a preprocessor.
    pub fn file_load(&self) -> Option<FileLoadHook> {
        match self {
            Self::Preprocessor(h) => h.on_file_load.clone(),
            _ => None,
        }
    }

    /// Returns the `onFrameworkExecution` hook of a reporter.
    pub fn framework_execution(&self) -> Option<FrameworkExecutionHook> {
        match self {
            Self::Reporter(h) => h.on_framework_execution.clone(),
            _ => None,
        }
    }

    /// Events for which a hook is installed.
    pub fn installed_events(&self) -> Vec<HookEvent> {
        let mut events = Vec::new();
        for event in [HookEvent::OnLoad, HookEvent::OnExit] {
            if self.lifecycle(event).is_some() {
                events.push(event);
            }
        }
        if self.file_load().is_some() {
            events.push(HookEvent::OnFileLoad);
        }
        if self.framework_execution().is_some() {
            events.push(HookEvent::OnFrameworkExecution);
        }
        events
    }
}
