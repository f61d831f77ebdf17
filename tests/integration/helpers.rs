//! Shared test helpers for integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tempfile::TempDir;

use nutra_plugin::Orchestrator;
use nutra_plugin::hooks::LifecycleHook;
use nutra_plugin::prelude::*;

/// Ordered record of hook invocations shared between fake plugins.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    /// Returns a copy of all entries.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// A lifecycle hook that records `entry` when invoked.
    pub fn hook(&self, entry: impl Into<String>) -> LifecycleHook {
        let log = self.clone();
        let entry = entry.into();
        lifecycle_hook(move || {
            let log = log.clone();
            let entry = entry.clone();
            async move {
                log.push(entry);
                Ok(())
            }
        })
    }
}

/// A test project on disk plus a separate transient root.
pub struct TestProject {
    /// Project sources.
    pub dir: TempDir,
    /// Parent of the run's working directory.
    pub temp_root: TempDir,
}

impl TestProject {
    /// Creates a project with the given `(relative path, contents)` files.
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            let path = dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        Self {
            dir,
            temp_root: tempfile::tempdir().unwrap(),
        }
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a project file.
    pub fn file(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Options with `files` and `basePath` set, merged with `extra`.
    pub fn options(&self, files: &[&str], extra: Value) -> Value {
        let mut options = json!({
            "files": files,
            "basePath": self.path().to_string_lossy(),
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut options, extra) {
            base.extend(extra);
        }
        options
    }

    /// An orchestrator whose working directories live under `temp_root`.
    pub fn orchestrator(&self, resolver: StaticResolver) -> Orchestrator {
        Orchestrator::new(Arc::new(resolver)).with_temp_root(self.temp_root.path())
    }

    /// Entries left under the transient root.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp_root.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

/// A plugin implementing every kind, recording `onLoad`/`onExit` as
/// `"<event>:<group>"` entries.
pub fn recording_plugin(log: &EventLog) -> PluginExport {
    let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
    PluginExport::new()
        .module_loader(move |hooks, _, _| {
            hooks.on_load = Some(a.hook("onLoad:moduleloader"));
            hooks.on_exit = Some(a.hook("onExit:moduleloader"));
            Ok(())
        })
        .preprocessor(move |hooks, _, _| {
            hooks.on_load = Some(b.hook("onLoad:preprocessors"));
            hooks.on_exit = Some(b.hook("onExit:preprocessors"));
            Ok(())
        })
        .framework(move |hooks, _, _| {
            hooks.on_load = Some(c.hook("onLoad:frameworks"));
            hooks.on_exit = Some(c.hook("onExit:frameworks"));
            Ok(())
        })
        .reporter(move |hooks, _, _| {
            hooks.on_load = Some(d.hook("onLoad:reporters"));
            hooks.on_exit = Some(d.hook("onExit:reporters"));
            Ok(())
        })
}

/// The built-in plugins plus `extra`.
pub fn resolver_with(extra: Vec<(&str, PluginExport)>) -> StaticResolver {
    let mut resolver = nutra_plugin::builtin::builtin_resolver();
    for (name, module) in extra {
        resolver.register(name, module);
    }
    resolver
}
