//! Where a run configuration comes from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::NutraError;
use crate::result::NutraResult;

/// Capability handed to a [`ConfigProducer`]; captures the options it sets.
#[derive(Debug, Default)]
pub struct ConfigSetter {
    captured: Option<Value>,
}

impl ConfigSetter {
    /// Records the intended configuration. A later call replaces an earlier one.
    pub fn set(&mut self, options: Value) {
        self.captured = Some(options);
    }

    /// Returns the captured configuration, if any was set.
    pub fn into_inner(self) -> Option<Value> {
        self.captured
    }
}

/// An external source that produces a configuration by calling the setter.
pub trait ConfigProducer: Send + Sync {
    /// Produces the configuration into `setter`.
    fn configure(&self, setter: &mut ConfigSetter) -> NutraResult<()>;
}

impl<F> ConfigProducer for F
where
    F: Fn(&mut ConfigSetter) -> NutraResult<()> + Send + Sync,
{
    fn configure(&self, setter: &mut ConfigSetter) -> NutraResult<()> {
        self(setter)
    }
}

/// Any accepted form of run configuration.
#[derive(Clone)]
pub enum ConfigInput {
    /// An options value supplied directly.
    Options(Value),
    /// A configuration file, `.json` or `.toml`.
    Path(PathBuf),
    /// A callable producing the options through a setter.
    Producer(Arc<dyn ConfigProducer>),
}

impl fmt::Debug for ConfigInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Options(value) => f.debug_tuple("Options").field(value).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Producer(_) => f.debug_tuple("Producer").field(&"<producer>").finish(),
        }
    }
}

impl ConfigInput {
    /// Wraps a producer.
    pub fn producer(producer: impl ConfigProducer + 'static) -> Self {
        Self::Producer(Arc::new(producer))
    }

    /// Reads the options object out of this input.
    pub fn into_options(self) -> NutraResult<Map<String, Value>> {
        let value = match self {
            Self::Options(value) => Some(value),
            Self::Path(path) => capture(&FileConfigSource::open(&path)?)?,
            Self::Producer(producer) => capture(producer.as_ref())?,
        };

        match value {
            Some(Value::Object(options)) => Ok(options),
            _ => Err(NutraError::empty_options()),
        }
    }
}

fn capture(producer: &dyn ConfigProducer) -> NutraResult<Option<Value>> {
    let mut setter = ConfigSetter::default();
    producer.configure(&mut setter)?;
    Ok(setter.into_inner())
}

impl From<Value> for ConfigInput {
    fn from(value: Value) -> Self {
        Self::Options(value)
    }
}

impl From<PathBuf> for ConfigInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ConfigInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// A configuration file parsed by extension.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    /// Absolute location of the file.
    path: PathBuf,
    /// Parsed contents.
    options: Value,
}

impl FileConfigSource {
    /// Reads and parses a configuration file. Relative paths resolve against
    /// the process working directory.
    ///
    /// Every failure is reported as `InvalidOptionsPath` naming `path`.
    pub fn open(path: impl AsRef<Path>) -> NutraResult<Self> {
        let requested = path.as_ref();
        let resolved = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| NutraError::invalid_options_path(requested, e))?
                .join(requested)
        };

        let contents = std::fs::read_to_string(&resolved)
            .map_err(|e| NutraError::invalid_options_path(requested, e))?;

        let options = match resolved.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| NutraError::invalid_options_path(requested, e))?,
            Some("toml") => toml::from_str::<Value>(&contents)
                .map_err(|e| NutraError::invalid_options_path(requested, e))?,
            other => {
                let unsupported = std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("unsupported configuration format: {}", other.unwrap_or("<none>")),
                );
                return Err(NutraError::invalid_options_path(requested, unsupported));
            }
        };

        debug!(path = %resolved.display(), "Configuration file loaded");

        Ok(Self {
            path: resolved,
            options,
        })
    }

    /// Returns the resolved file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProducer for FileConfigSource {
    fn configure(&self, setter: &mut ConfigSetter) -> NutraResult<()> {
        setter.set(self.options.clone());
        Ok(())
    }
}
