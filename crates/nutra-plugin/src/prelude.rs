//! Prelude for plugin authors.

pub use nutra_core::error::{ErrorKind, NutraError};
pub use nutra_core::result::NutraResult;

pub use crate::context::RunContext;
pub use crate::exports::PluginExport;
pub use crate::hooks::definitions::{FileLoadOutcome, FileRewrite, FileSource, PluginKind};
pub use crate::hooks::sets::{
    FrameworkHooks, ModuleLoaderHooks, PreprocessorHooks, ReporterHooks, file_load_hook,
    framework_execution_hook, lifecycle_hook,
};
pub use crate::registry::{PluginModule, StaticResolver};
