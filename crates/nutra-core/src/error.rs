//! Unified error types for Nutra.
//!
//! Every failure of a run, from configuration validation to a plugin hook
//! rejecting, is mapped into [`NutraError`] so it propagates through `?`
//! and reaches the lifecycle controller's error policy.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The configuration is absent or not an object.
    EmptyOptions,
    /// A configuration supplied by reference could not be resolved.
    InvalidOptionsPath,
    /// The `files` option is missing or not a sequence of strings.
    InvalidFilesOption,
    /// The `files` patterns did not match any file.
    EmptyFilesOption,
    /// A referenced plugin could not be resolved to the requested capability.
    PluginResolution,
    /// A plugin hook rejected, failed or panicked during the run.
    HookExecution,
    /// The transient working directory could not be managed.
    Workspace,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An optional configuration field or an environment setting is malformed.
    Configuration,
    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOptions => write!(f, "EMPTY_OPTIONS"),
            Self::InvalidOptionsPath => write!(f, "INVALID_OPTIONS_PATH"),
            Self::InvalidFilesOption => write!(f, "INVALID_FILES_OPTION"),
            Self::EmptyFilesOption => write!(f, "EMPTY_FILES_OPTION"),
            Self::PluginResolution => write!(f, "PLUGIN_RESOLUTION"),
            Self::HookExecution => write!(f, "HOOK_EXECUTION"),
            Self::Workspace => write!(f, "WORKSPACE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout Nutra.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct NutraError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl NutraError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The configuration is absent or not an object.
    pub fn empty_options() -> Self {
        Self::new(
            ErrorKind::EmptyOptions,
            "Please provide a valid configuration. Value received is not an object.",
        )
    }

    /// A configuration reference could not be resolved.
    pub fn invalid_options_path(
        path: &Path,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(
            ErrorKind::InvalidOptionsPath,
            format!(
                "Please provide a valid configuration file. Value received did not lead to a valid configuration: \"{}\"",
                path.display()
            ),
            source,
        )
    }

    /// The `files` option has the wrong shape.
    pub fn invalid_files_option(received: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidFilesOption,
            format!(
                "Please provide a valid file configuration. Value received is not an array: {received}"
            ),
        )
    }

    /// The `files` patterns matched nothing.
    ///
    /// The message ends with the literal patterns that were attempted, or
    /// `None.` when there were none.
    pub fn empty_files_option(patterns: &[String]) -> Self {
        let attempted = if patterns.is_empty() {
            "None.".to_string()
        } else {
            patterns.join(", ")
        };
        Self::new(
            ErrorKind::EmptyFilesOption,
            format!(
                "Please provide a valid file configuration. Are the patterns relative to the base path? The glob patterns did not amount to any files: {attempted}"
            ),
        )
    }

    /// Create a plugin resolution error.
    pub fn plugin_resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginResolution, message)
    }

    /// Create a hook execution error.
    pub fn hook_execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HookExecution, message)
    }

    /// Create a workspace error.
    pub fn workspace(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Workspace, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error comes from validating the run configuration.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::EmptyOptions
                | ErrorKind::InvalidOptionsPath
                | ErrorKind::InvalidFilesOption
                | ErrorKind::EmptyFilesOption
        )
    }

    /// Renders the error followed by its whole cause chain.
    pub fn diagnostic(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str("\n  caused by: ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

/// Cloning keeps kind and message and drops the cause chain.
impl Clone for NutraError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for NutraError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<toml::de::Error> for NutraError {
    fn from(err: toml::de::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("TOML deserialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for NutraError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Workspace, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for NutraError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
