//! Dynamic plugin resolver using `libloading` (feature-gated).

#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex, PoisonError};

    use tracing::info;

    use nutra_core::error::NutraError;
    use nutra_core::result::NutraResult;

    use crate::exports::PluginExport;
    use crate::registry::{PluginModule, PluginResolver};

    /// Symbol every dynamic plugin exports.
    pub const ENTRY_SYMBOL: &[u8] = b"nutra_plugin_module";

    /// Type of the entry point exported by dynamic plugins.
    ///
    /// Dynamic plugins must export:
    /// `extern "C" fn nutra_plugin_module() -> *mut PluginExport`, returning
    /// a pointer obtained from `Box::into_raw`. Plugin and host must be built
    /// with the same compiler and `nutra-plugin` version.
    pub type ModuleEntryFn = unsafe extern "C" fn() -> *mut PluginExport;

    /// Resolves plugin names to shared libraries (`lib<name>.so` and
    /// platform equivalents) inside a plugin directory.
    pub struct DynamicResolver {
        /// Directory searched for plugin libraries.
        dir: PathBuf,
        /// Loaded libraries, kept alive for the lifetime of the resolver.
        libraries: Mutex<Vec<libloading::Library>>,
    }

    impl DynamicResolver {
        /// Creates a resolver over `dir`.
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self {
                dir: dir.into(),
                libraries: Mutex::new(Vec::new()),
            }
        }

        /// The plugin directory.
        pub fn dir(&self) -> &Path {
            &self.dir
        }

        /// Library path a plugin name maps to.
        pub fn library_path(&self, name: &str) -> PathBuf {
            self.dir
                .join(libloading::library_filename(name.replace('-', "_")))
        }
    }

    impl PluginResolver for DynamicResolver {
        fn load(&self, name: &str) -> NutraResult<Arc<dyn PluginModule>> {
            let path = self.library_path(name);

            // SAFETY: loading a library runs its initializers; only trusted
            // plugin directories are configured.
            let library = unsafe { libloading::Library::new(&path) }.map_err(|e| {
                NutraError::plugin_resolution(format!(
                    "Failed to load plugin library '{}': {e}",
                    path.display()
                ))
            })?;

            // SAFETY: the symbol type is the documented plugin entry point.
            let module = unsafe {
                let entry: libloading::Symbol<ModuleEntryFn> =
                    library.get(ENTRY_SYMBOL).map_err(|e| {
                        NutraError::plugin_resolution(format!(
                            "Plugin '{}' missing 'nutra_plugin_module' symbol: {e}",
                            path.display()
                        ))
                    })?;
                let raw = entry();
                if raw.is_null() {
                    return Err(NutraError::plugin_resolution(format!(
                        "Plugin '{}' returned no module",
                        path.display()
                    )));
                }
                Box::from_raw(raw)
            };

            info!(plugin = %name, path = %path.display(), "Dynamic plugin loaded");

            self.libraries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(library);

            Ok(Arc::new(*module))
        }
    }

    impl std::fmt::Debug for DynamicResolver {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let loaded = self
                .libraries
                .lock()
                .map(|libraries| libraries.len())
                .unwrap_or_default();
            f.debug_struct("DynamicResolver")
                .field("dir", &self.dir)
                .field("loaded_count", &loaded)
                .finish()
        }
    }

}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::DynamicResolver;
