//! Plugin registry: resolves plugin names to kind-specific constructors and
//! instantiates them against the run context.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use nutra_core::config::RunConfig;
use nutra_core::error::{ErrorKind, NutraError};
use nutra_core::result::NutraResult;

use crate::context::RunContext;
use crate::hooks::definitions::PluginKind;
use crate::hooks::scheduler::panic_message;
use crate::hooks::sets::{
    FrameworkHooks, HookSet, ModuleLoaderHooks, PreprocessorHooks, ReporterHooks,
};
use crate::preprocess::PreprocessorFilter;

/// Namespace prefix of plugin names.
pub const PLUGIN_PREFIX: &str = "nutra-";

/// Module loader used when the configuration names none.
pub const DEFAULT_MODULE_LOADER: &str = "nutra-stage";

/// A plugin constructor: installs hooks into a fresh set of its kind.
pub type Constructor<H> =
    Arc<dyn Fn(&mut H, &RunContext, &Value) -> NutraResult<()> + Send + Sync>;

/// The constructor a plugin module exports for one kind.
#[derive(Clone)]
pub enum Capability {
    /// Module loader constructor.
    ModuleLoader(Constructor<ModuleLoaderHooks>),
    /// Preprocessor constructor.
    Preprocessor(Constructor<PreprocessorHooks>),
    /// Framework constructor.
    Framework(Constructor<FrameworkHooks>),
    /// Reporter constructor.
    Reporter(Constructor<ReporterHooks>),
}

impl Capability {
    /// The kind this capability constructs.
    pub fn kind(&self) -> PluginKind {
        match self {
            Self::ModuleLoader(_) => PluginKind::ModuleLoader,
            Self::Preprocessor(_) => PluginKind::Preprocessor,
            Self::Framework(_) => PluginKind::Framework,
            Self::Reporter(_) => PluginKind::Reporter,
        }
    }

    /// Builds a fresh hook set and lets the constructor fill it.
    pub fn construct(&self, ctx: &RunContext, options: &Value) -> NutraResult<HookSet> {
        let set = match self {
            Self::ModuleLoader(constructor) => {
                let mut hooks = ModuleLoaderHooks::default();
                constructor(&mut hooks, ctx, options)?;
                HookSet::ModuleLoader(hooks)
            }
            Self::Preprocessor(constructor) => {
                let mut hooks = PreprocessorHooks::default();
                constructor(&mut hooks, ctx, options)?;
                HookSet::Preprocessor(hooks)
            }
            Self::Framework(constructor) => {
                let mut hooks = FrameworkHooks::default();
                constructor(&mut hooks, ctx, options)?;
                HookSet::Framework(hooks)
            }
            Self::Reporter(constructor) => {
                let mut hooks = ReporterHooks::default();
                constructor(&mut hooks, ctx, options)?;
                HookSet::Reporter(hooks)
            }
        };
        Ok(set)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.kind()).finish()
    }
}

/// A loaded plugin module, exposing one constructor per kind it implements.
pub trait PluginModule: Send + Sync + fmt::Debug {
    /// Returns the constructor for `kind`, if the module implements it.
    fn capability(&self, kind: PluginKind) -> Option<Capability>;
}

/// Maps a qualified plugin name to its module.
pub trait PluginResolver: Send + Sync + fmt::Debug {
    /// Loads the module registered under `name`.
    fn load(&self, name: &str) -> NutraResult<Arc<dyn PluginModule>>;
}

/// In-process table of plugin modules.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    /// Qualified name → module.
    modules: HashMap<String, Arc<dyn PluginModule>>,
}

impl StaticResolver {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module. The name is qualified with the namespace prefix.
    pub fn register(&mut self, name: &str, module: impl PluginModule + 'static) -> &mut Self {
        let name = qualified_name(name);
        debug!(plugin = %name, "Plugin module registered");
        self.modules.insert(name, Arc::new(module));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: &str, module: impl PluginModule + 'static) -> Self {
        self.register(name, module);
        self
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl PluginResolver for StaticResolver {
    fn load(&self, name: &str) -> NutraResult<Arc<dyn PluginModule>> {
        self.modules.get(name).cloned().ok_or_else(|| {
            NutraError::plugin_resolution(format!("Plugin '{name}' is not registered"))
        })
    }
}

/// Tries `primary`, then `secondary`.
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    primary: Arc<dyn PluginResolver>,
    secondary: Arc<dyn PluginResolver>,
}

impl FallbackResolver {
    /// Chains two resolvers.
    pub fn new(primary: Arc<dyn PluginResolver>, secondary: Arc<dyn PluginResolver>) -> Self {
        Self { primary, secondary }
    }
}

impl PluginResolver for FallbackResolver {
    fn load(&self, name: &str) -> NutraResult<Arc<dyn PluginModule>> {
        match self.primary.load(name) {
            Ok(module) => Ok(module),
            Err(err) => {
                debug!(plugin = %name, error = %err, "Primary resolver failed, trying fallback");
                self.secondary.load(name)
            }
        }
    }
}

/// A resolved plugin, ready to be instantiated.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Qualified plugin name.
    pub name: String,
    /// Constructor for the requested kind.
    pub capability: Capability,
    /// The plugin's `<short>Options` slice.
    pub options: Value,
}

/// An instantiated plugin and the hooks it installed.
#[derive(Debug, Clone)]
pub struct PluginInstance {
    /// Qualified plugin name.
    pub name: String,
    /// Installed hooks.
    pub hooks: HookSet,
}

impl PluginInstance {
    /// Pairs a name with a hook set.
    pub fn new(name: impl Into<String>, hooks: HookSet) -> Self {
        Self {
            name: name.into(),
            hooks,
        }
    }

    /// The instance's kind.
    pub fn kind(&self) -> PluginKind {
        self.hooks.kind()
    }
}

/// All instances of a run, grouped by kind in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginInstances {
    module_loaders: Vec<PluginInstance>,
    preprocessors: Vec<PluginInstance>,
    frameworks: Vec<PluginInstance>,
    reporters: Vec<PluginInstance>,
}

impl PluginInstances {
    /// Appends an instance to its kind's group.
    pub fn push(&mut self, instance: PluginInstance) {
        match instance.kind() {
            PluginKind::ModuleLoader => self.module_loaders.push(instance),
            PluginKind::Preprocessor => self.preprocessors.push(instance),
            PluginKind::Framework => self.frameworks.push(instance),
            PluginKind::Reporter => self.reporters.push(instance),
        }
    }

    /// Instances of one kind.
    pub fn of_kind(&self, kind: PluginKind) -> &[PluginInstance] {
        match kind {
            PluginKind::ModuleLoader => &self.module_loaders,
            PluginKind::Preprocessor => &self.preprocessors,
            PluginKind::Framework => &self.frameworks,
            PluginKind::Reporter => &self.reporters,
        }
    }

    /// Total number of instances.
    pub fn count(&self) -> usize {
        self.module_loaders.len()
            + self.preprocessors.len()
            + self.frameworks.len()
            + self.reporters.len()
    }
}

/// Adds the namespace prefix unless present.
pub fn qualified_name(name: &str) -> String {
    if name.starts_with(PLUGIN_PREFIX) {
        name.to_string()
    } else {
        format!("{PLUGIN_PREFIX}{name}")
    }
}

/// Strips the namespace prefix, if present.
pub fn short_name(name: &str) -> &str {
    name.strip_prefix(PLUGIN_PREFIX).unwrap_or(name)
}

/// Resolves and instantiates plugins.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    resolver: Arc<dyn PluginResolver>,
}

impl PluginRegistry {
    /// Creates a registry over `resolver`.
    pub fn new(resolver: Arc<dyn PluginResolver>) -> Self {
        Self { resolver }
    }

    /// Plugin names configured for `kind`, qualified and deduplicated.
    ///
    /// Preprocessor names come from the inverted ownership filter; a missing
    /// module loader falls back to [`DEFAULT_MODULE_LOADER`].
    pub fn plugin_names(
        &self,
        kind: PluginKind,
        config: &RunConfig,
        filter: &PreprocessorFilter,
    ) -> Vec<String> {
        let configured: Vec<String> = match kind {
            PluginKind::ModuleLoader => vec![
                config
                    .moduleloader
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MODULE_LOADER.to_string()),
            ],
            PluginKind::Preprocessor => filter.plugins(),
            PluginKind::Framework => config.frameworks.clone(),
            PluginKind::Reporter => config.reporters.clone(),
        };

        let mut names: Vec<String> = Vec::with_capacity(configured.len());
        for name in configured.iter().map(|name| qualified_name(name)) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Resolves each name to its `kind` constructor and options slice.
    pub fn resolve(
        &self,
        names: &[String],
        kind: PluginKind,
        config: &RunConfig,
    ) -> NutraResult<Vec<PluginDescriptor>> {
        names
            .iter()
            .map(|name| {
                let name = qualified_name(name);
                let module = self.resolver.load(&name).map_err(|e| {
                    NutraError::with_source(
                        ErrorKind::PluginResolution,
                        format!("Failed to load plugin '{name}'"),
                        e,
                    )
                })?;
                let capability = module.capability(kind).ok_or_else(|| {
                    NutraError::plugin_resolution(format!(
                        "Plugin '{name}' does not provide a {kind} capability"
                    ))
                })?;
                let options = config.plugin_options(short_name(&name));
                Ok(PluginDescriptor {
                    name,
                    capability,
                    options,
                })
            })
            .collect()
    }

    /// Invokes each constructor once, in order.
    pub fn instantiate(
        &self,
        descriptors: Vec<PluginDescriptor>,
        ctx: &RunContext,
    ) -> NutraResult<Vec<PluginInstance>> {
        descriptors
            .into_iter()
            .map(|descriptor| {
                let kind = descriptor.capability.kind();
                let constructed = panic::catch_unwind(AssertUnwindSafe(|| {
                    descriptor.capability.construct(ctx, &descriptor.options)
                }))
                .unwrap_or_else(|payload| {
                    Err(NutraError::internal(format!(
                        "Constructor panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });
                let hooks = constructed.map_err(|e| {
                    NutraError::with_source(
                        ErrorKind::PluginResolution,
                        format!("Plugin '{}' failed to initialize as {kind}", descriptor.name),
                        e,
                    )
                })?;
                info!(
                    plugin = %descriptor.name,
                    kind = %kind,
                    hooks = ?hooks.installed_events(),
                    "Plugin loaded"
                );
                Ok(PluginInstance::new(descriptor.name, hooks))
            })
            .collect()
    }

    /// Resolves and instantiates every configured plugin, kind by kind.
    pub fn load_all(
        &self,
        ctx: &RunContext,
        filter: &PreprocessorFilter,
    ) -> NutraResult<PluginInstances> {
        let mut instances = PluginInstances::default();
        for kind in PluginKind::LOAD_ORDER {
            let names = self.plugin_names(kind, ctx.config(), filter);
            let descriptors = self.resolve(&names, kind, ctx.config())?;
            for instance in self.instantiate(descriptors, ctx)? {
                instances.push(instance);
            }
        }
        Ok(instances)
    }
}
