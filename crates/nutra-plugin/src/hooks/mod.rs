//! Hook system: kinds and events, per-kind hook sets, and the lifecycle
//! scheduler that drives them.

pub mod definitions;
pub mod scheduler;
pub mod sets;

pub use definitions::{
    DEFAULT_PHASES, FileLoadOutcome, FileRewrite, FileSource, HookEvent, LifecyclePhase,
    PluginKind,
};
pub use scheduler::HookScheduler;
pub use sets::{
    FileLoadHook, FrameworkExecutionHook, FrameworkHooks, HookFuture, HookSet, LifecycleHook,
    ModuleLoaderHooks, PreprocessorHooks, ReporterHooks, file_load_hook,
    framework_execution_hook, lifecycle_hook,
};
