//! Builder plugins use to declare the capabilities they export.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use nutra_core::result::NutraResult;

use crate::context::RunContext;
use crate::hooks::definitions::PluginKind;
use crate::hooks::sets::{FrameworkHooks, ModuleLoaderHooks, PreprocessorHooks, ReporterHooks};
use crate::registry::{Capability, Constructor, PluginModule};

/// A plugin module assembled from per-kind constructors.
///
/// ```ignore
/// let module = PluginExport::new()
///     .preprocessor(|hooks, _ctx, _options| {
///         hooks.on_file_load = Some(file_load_hook(|file| async move {
///             Ok(file.source.replace("const ", "var "))
///         }));
///         Ok(())
///     })
///     .reporter(|hooks, _ctx, _options| Ok(()));
/// ```
#[derive(Clone, Default)]
pub struct PluginExport {
    module_loader: Option<Constructor<ModuleLoaderHooks>>,
    preprocessor: Option<Constructor<PreprocessorHooks>>,
    framework: Option<Constructor<FrameworkHooks>>,
    reporter: Option<Constructor<ReporterHooks>>,
}

impl PluginExport {
    /// Creates an export with no capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the module loader constructor.
    pub fn module_loader<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&mut ModuleLoaderHooks, &RunContext, &Value) -> NutraResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.module_loader = Some(Arc::new(constructor));
        self
    }

    /// Declares the preprocessor constructor.
    pub fn preprocessor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&mut PreprocessorHooks, &RunContext, &Value) -> NutraResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.preprocessor = Some(Arc::new(constructor));
        self
    }

    /// Declares the framework constructor.
    pub fn framework<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&mut FrameworkHooks, &RunContext, &Value) -> NutraResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.framework = Some(Arc::new(constructor));
        self
    }

    /// Declares the reporter constructor.
    pub fn reporter<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&mut ReporterHooks, &RunContext, &Value) -> NutraResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.reporter = Some(Arc::new(constructor));
        self
    }

    /// Kinds this export implements.
    pub fn kinds(&self) -> Vec<PluginKind> {
        [
            (PluginKind::ModuleLoader, self.module_loader.is_some()),
            (PluginKind::Preprocessor, self.preprocessor.is_some()),
            (PluginKind::Framework, self.framework.is_some()),
            (PluginKind::Reporter, self.reporter.is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, present)| present.then_some(kind))
        .collect()
    }
}

impl PluginModule for PluginExport {
    fn capability(&self, kind: PluginKind) -> Option<Capability> {
        match kind {
            PluginKind::ModuleLoader => self.module_loader.clone().map(Capability::ModuleLoader),
            PluginKind::Preprocessor => self.preprocessor.clone().map(Capability::Preprocessor),
            PluginKind::Framework => self.framework.clone().map(Capability::Framework),
            PluginKind::Reporter => self.reporter.clone().map(Capability::Reporter),
        }
    }
}

impl fmt::Debug for PluginExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginExport")
            .field("kinds", &self.kinds())
            .finish()
    }
}
