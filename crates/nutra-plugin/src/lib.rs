//! # nutra-plugin
//!
//! Plugin orchestration for Nutra. Provides:
//!
//! - Plugin kinds, hook events and per-kind hook sets
//! - Plugin registry with injectable resolvers
//! - The run context shared by all plugins, with its error policy
//! - The preprocessor ownership filter and chain
//! - The lifecycle scheduler and the orchestrator driving a full run
//! - The built-in `nutra-stage` module loader
//! - Optional dynamic loading via `libloading`

pub mod builtin;
pub mod context;
pub mod exports;
pub mod hooks;
pub mod lifecycle;
pub mod loader;
pub mod prelude;
pub mod preprocess;
pub mod registry;

pub use context::{ErrorPolicy, RunContext};
pub use exports::PluginExport;
pub use hooks::definitions::{HookEvent, LifecyclePhase, PluginKind};
pub use hooks::scheduler::HookScheduler;
pub use lifecycle::{Orchestrator, RunSummary};
pub use preprocess::{PreprocessorChain, PreprocessorFilter};
pub use registry::{FallbackResolver, PluginRegistry, PluginResolver, StaticResolver};
