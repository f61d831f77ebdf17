//! Run configuration.
//!
//! A run is described by a loosely-typed options object (the shape users
//! write in `nutra.config.json` / `nutra.config.toml`). [`resolve`] turns
//! any [`ConfigInput`] into a validated [`RunConfig`] plus the expanded file
//! set, or fails with one of the validation error kinds.
//!
//! The process-level [`settings::Settings`] are separate: they come from the
//! environment and only govern logging.

pub mod logging;
pub mod settings;
pub mod source;

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{ErrorKind, NutraError};
use crate::glob;
use crate::result::NutraResult;

pub use self::source::{ConfigInput, ConfigProducer, ConfigSetter, FileConfigSource};

/// One entry of the `preprocessors` option: a glob and the plugins that own it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreprocessorRule {
    /// Glob pattern as written in the configuration.
    pub pattern: String,
    /// Plugin names, in the order they should run.
    pub plugins: Vec<String>,
}

/// A validated run configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Glob patterns, as written.
    pub files: Vec<String>,
    /// Directory relative patterns are resolved against.
    pub base_path: PathBuf,
    /// When set, `basePath` is ignored and relative patterns are anchored
    /// to the process working directory.
    pub absolute_paths: bool,
    /// Preprocessor ownership in declaration order.
    pub preprocessors: Vec<PreprocessorRule>,
    /// Framework plugin names.
    pub frameworks: Vec<String>,
    /// Reporter plugin names.
    pub reporters: Vec<String>,
    /// Module loader plugin name; the built-in loader when absent.
    pub moduleloader: Option<String>,
    /// The full options object with defaults merged in, used for
    /// `<name>Options` lookups.
    #[serde(skip)]
    pub options: Map<String, Value>,
}

/// A run configuration together with its expanded file set.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: RunConfig,
    /// Sorted, deduplicated files matched by `config.files`.
    pub files: Vec<PathBuf>,
}

impl RunConfig {
    /// Validates an options object and fills in defaults.
    ///
    /// Explicitly supplied values always win over defaults.
    pub fn from_options(mut options: Map<String, Value>) -> NutraResult<Self> {
        let files = match options.get("files") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| NutraError::invalid_files_option(Value::Array(items.clone())))?,
            Some(other) => return Err(NutraError::invalid_files_option(other)),
            None => return Err(NutraError::invalid_files_option("undefined")),
        };

        let absolute_paths = match options.get("absolutePaths") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(NutraError::configuration(format!(
                    "Option 'absolutePaths' must be a boolean, received: {other}"
                )));
            }
        };

        let base_path = match options.get("basePath") {
            Some(Value::String(path)) => PathBuf::from(path),
            None | Some(Value::Null) if absolute_paths => PathBuf::new(),
            None | Some(Value::Null) => current_dir()?,
            Some(other) => {
                return Err(NutraError::configuration(format!(
                    "Option 'basePath' must be a string, received: {other}"
                )));
            }
        };
        options.insert(
            "basePath".to_string(),
            Value::String(base_path.to_string_lossy().into_owned()),
        );

        let preprocessors = match options.get("preprocessors") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(rules)) => rules
                .iter()
                .map(|(pattern, plugins)| {
                    Ok(PreprocessorRule {
                        pattern: pattern.clone(),
                        plugins: plugin_names("preprocessors", Some(plugins))?,
                    })
                })
                .collect::<NutraResult<Vec<_>>>()?,
            Some(other) => {
                return Err(NutraError::configuration(format!(
                    "Option 'preprocessors' must map glob patterns to plugin names, received: {other}"
                )));
            }
        };

        let frameworks = plugin_names("frameworks", options.get("frameworks"))?;
        let reporters = plugin_names("reporters", options.get("reporters"))?;

        let moduleloader = match options.get("moduleloader") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(other) => {
                return Err(NutraError::configuration(format!(
                    "Option 'moduleloader' must be a plugin name, received: {other}"
                )));
            }
        };

        Ok(Self {
            files,
            base_path,
            absolute_paths,
            preprocessors,
            frameworks,
            reporters,
            moduleloader,
            options,
        })
    }

    /// Returns the `<short_name>Options` object, or an empty object.
    pub fn plugin_options(&self, short_name: &str) -> Value {
        match self.options.get(&format!("{short_name}Options")) {
            Some(value @ Value::Object(_)) => value.clone(),
            _ => Value::Object(Map::new()),
        }
    }

    /// Resolves a pattern against the base path, or against the process
    /// working directory when `absolute_paths` is set. Absolute patterns
    /// are kept as written in that mode.
    pub fn resolve_pattern(&self, pattern: &str) -> NutraResult<String> {
        let base = if !self.absolute_paths {
            self.base_path.clone()
        } else if Path::new(pattern).is_absolute() {
            return Ok(pattern.to_string());
        } else {
            current_dir()?
        };
        Ok(glob::clean(&base.join(pattern))
            .to_string_lossy()
            .into_owned())
    }

    /// The `files` patterns in the form they are expanded in.
    pub fn resolved_patterns(&self) -> NutraResult<Vec<String>> {
        if self.absolute_paths {
            self.files
                .iter()
                .map(|pattern| self.resolve_pattern(pattern))
                .collect()
        } else {
            Ok(glob::normalize(&self.files, &self.base_path))
        }
    }

    /// Returns the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// Reads and validates a configuration, then expands its file patterns.
pub fn resolve(input: impl Into<ConfigInput>) -> NutraResult<ResolvedConfig> {
    let options = input.into().into_options()?;
    let config = RunConfig::from_options(options)?;

    let files: Vec<PathBuf> = glob::expand(&config.resolved_patterns()?)?
        .into_iter()
        .collect();
    if files.is_empty() {
        return Err(NutraError::empty_files_option(&config.files));
    }

    info!(
        files = files.len(),
        base_path = %config.base_path.display(),
        absolute_paths = config.absolute_paths,
        "Configuration resolved"
    );

    Ok(ResolvedConfig { config, files })
}

fn current_dir() -> NutraResult<PathBuf> {
    std::env::current_dir().map_err(|e| {
        NutraError::with_source(
            ErrorKind::Configuration,
            "Failed to determine the current working directory",
            e,
        )
    })
}

/// Accepts a single plugin name or a sequence of names.
fn plugin_names(option: &str, value: Option<&Value>) -> NutraResult<Vec<String>> {
    let invalid = |received: &Value| {
        NutraError::configuration(format!(
            "Option '{option}' must be a plugin name or a list of plugin names, received: {received}"
        ))
    };

    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(name)) => Ok(vec![name.clone()]),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| name.as_str().map(str::to_string).ok_or_else(|| invalid(name)))
            .collect(),
        Some(other) => Err(invalid(other)),
    }
}
