//! Preprocessor ownership and chaining.
//!
//! The `preprocessors` option maps globs to plugin names. [`PreprocessorFilter`]
//! inverts it into plugin → globs, and [`PreprocessorChain`] uses that to
//! pick, for each loaded file, the preprocessors that own it and thread the
//! `(source, filename, key)` triple through them in registration order.

use std::fmt;

use tracing::debug;

use nutra_core::config::RunConfig;
use nutra_core::error::{ErrorKind, NutraError};
use nutra_core::glob::{GlobPattern, PatternSet};
use nutra_core::result::NutraResult;

use crate::hooks::definitions::FileSource;
use crate::hooks::sets::FileLoadHook;
use crate::registry::{PluginInstance, qualified_name};

/// Plugin name → owned globs, in order of first appearance. Each plugin's
/// globs are compiled once, when the filter is built.
#[derive(Debug, Clone, Default)]
pub struct PreprocessorFilter {
    owners: Vec<Ownership>,
}

#[derive(Debug, Clone)]
struct Ownership {
    plugin: String,
    globs: Vec<String>,
    patterns: PatternSet,
}

impl PreprocessorFilter {
    /// Inverts the configured rules. Globs are resolved against the base
    /// path, or against the working directory when `absolutePaths` is set
    /// and the glob is relative.
    pub fn from_config(config: &RunConfig) -> NutraResult<Self> {
        let mut filter = Self::default();
        for rule in &config.preprocessors {
            let glob = config.resolve_pattern(&rule.pattern)?;
            let compiled = GlobPattern::new(&glob)?;
            for plugin in &rule.plugins {
                filter.own(qualified_name(plugin), &compiled);
            }
        }
        Ok(filter)
    }

    fn own(&mut self, plugin: String, glob: &GlobPattern) {
        let index = match self.owners.iter().position(|owner| owner.plugin == plugin) {
            Some(index) => index,
            None => {
                self.owners.push(Ownership {
                    plugin,
                    globs: Vec::new(),
                    patterns: PatternSet::default(),
                });
                self.owners.len() - 1
            }
        };
        let owner = &mut self.owners[index];
        if !owner.globs.iter().any(|existing| existing == glob.as_str()) {
            owner.globs.push(glob.as_str().to_string());
            owner.patterns.push(glob.clone());
        }
    }

    /// Deduplicated plugin names in registration order.
    pub fn plugins(&self) -> Vec<String> {
        self.owners.iter().map(|owner| owner.plugin.clone()).collect()
    }

    /// Globs owned by `plugin` (qualified name); empty when it owns none.
    pub fn globs(&self, plugin: &str) -> &[String] {
        self.owner(plugin)
            .map(|owner| owner.globs.as_slice())
            .unwrap_or(&[])
    }

    /// Compiled globs owned by `plugin`.
    pub fn patterns(&self, plugin: &str) -> PatternSet {
        self.owner(plugin)
            .map(|owner| owner.patterns.clone())
            .unwrap_or_default()
    }

    fn owner(&self, plugin: &str) -> Option<&Ownership> {
        self.owners.iter().find(|owner| owner.plugin == plugin)
    }

    /// Whether no preprocessor is configured.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

struct ChainLink {
    name: String,
    hook: FileLoadHook,
    patterns: PatternSet,
}

/// Ordered `onFileLoad` hooks with the globs each one owns.
#[derive(Default)]
pub struct PreprocessorChain {
    links: Vec<ChainLink>,
}

impl PreprocessorChain {
    /// Builds the chain from instantiated preprocessors. Instances without
    /// an `onFileLoad` hook take no part.
    pub fn new(instances: &[PluginInstance], filter: &PreprocessorFilter) -> Self {
        let links = instances
            .iter()
            .filter_map(|instance| {
                instance.hooks.file_load().map(|hook| ChainLink {
                    name: instance.name.clone(),
                    hook,
                    patterns: filter.patterns(&instance.name),
                })
            })
            .collect();
        Self { links }
    }

    /// Names of the preprocessors owning `filename`, in registration order.
    pub fn owners_of(&self, filename: &str) -> Vec<&str> {
        self.owning(filename)
            .into_iter()
            .map(|link| link.name.as_str())
            .collect()
    }

    fn owning(&self, filename: &str) -> Vec<&ChainLink> {
        self.links
            .iter()
            .filter(|link| link.patterns.is_match(filename))
            .collect()
    }

    /// Threads the triple through the owners of `filename` and returns the
    /// final source. Without owners `source` comes back untouched.
    ///
    /// Ownership is decided by the filename the loader passed in, even if a
    /// preprocessor renames the file along the way.
    pub async fn apply(&self, source: String, filename: String, key: String) -> NutraResult<String> {
        let owners = self.owning(&filename);
        if owners.is_empty() {
            return Ok(source);
        }

        debug!(file = %filename, preprocessors = owners.len(), "Preprocessing file");

        let mut triple = FileSource::new(source, filename.clone(), key);
        for link in owners {
            let outcome = (link.hook)(triple.clone()).await.map_err(|e| {
                NutraError::with_source(
                    ErrorKind::HookExecution,
                    format!("Preprocessor '{}' failed on {filename}", link.name),
                    e,
                )
            })?;
            triple = triple.apply(outcome);
        }
        Ok(triple.source)
    }

    /// Number of preprocessors taking part.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no preprocessor takes part.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl fmt::Debug for PreprocessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.links.iter().map(|link| {
                let globs: Vec<&str> = link.patterns.patterns().iter().map(|p| p.as_str()).collect();
                (link.name.as_str(), globs)
            }))
            .finish()
    }
}
