//! Plugin kinds, hook events, lifecycle phases, and the file triple threaded
//! through preprocessors.

use serde::{Deserialize, Serialize};

/// A capability category a plugin may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Reads source files and hands them to preprocessors.
    #[serde(rename = "moduleloader")]
    ModuleLoader,
    /// Rewrites source text of the files it owns.
    Preprocessor,
    /// Runs the tests.
    Framework,
    /// Reports results.
    Reporter,
}

impl PluginKind {
    /// Every kind, in the order plugins are loaded.
    pub const LOAD_ORDER: [PluginKind; 4] = [
        PluginKind::Preprocessor,
        PluginKind::Framework,
        PluginKind::Reporter,
        PluginKind::ModuleLoader,
    ];

    /// Name of the capability a plugin module exports for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleLoader => "moduleloader",
            Self::Preprocessor => "preprocessor",
            Self::Framework => "framework",
            Self::Reporter => "reporter",
        }
    }

    /// Name of the plugin group, as used by configuration keys and phases.
    pub fn group(&self) -> &'static str {
        match self {
            Self::ModuleLoader => "moduleloader",
            Self::Preprocessor => "preprocessors",
            Self::Framework => "frameworks",
            Self::Reporter => "reporters",
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event a plugin may install a hook for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    /// The plugin group is being loaded.
    #[serde(rename = "onLoad")]
    OnLoad,
    /// The plugin group is being torn down.
    #[serde(rename = "onExit")]
    OnExit,
    /// A source file was read (preprocessors only).
    #[serde(rename = "onFileLoad")]
    OnFileLoad,
    /// A framework announced its execution (reporters only).
    #[serde(rename = "onFrameworkExecution")]
    OnFrameworkExecution,
}

impl HookEvent {
    /// Returns the event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnLoad => "onLoad",
            Self::OnExit => "onExit",
            Self::OnFileLoad => "onFileLoad",
            Self::OnFrameworkExecution => "onFrameworkExecution",
        }
    }

    /// Whether plugins of `kind` have a slot for this event.
    pub fn supported_by(&self, kind: PluginKind) -> bool {
        match self {
            Self::OnLoad | Self::OnExit => true,
            Self::OnFileLoad => kind == PluginKind::Preprocessor,
            Self::OnFrameworkExecution => kind == PluginKind::Reporter,
        }
    }

    /// Whether the scheduler can drive this event as a lifecycle phase.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::OnLoad | Self::OnExit)
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One (event, kind) step of the run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecyclePhase {
    /// The lifecycle event.
    pub event: HookEvent,
    /// The plugin kind whose hooks run.
    pub kind: PluginKind,
}

impl LifecyclePhase {
    /// Creates a phase.
    pub const fn new(event: HookEvent, kind: PluginKind) -> Self {
        Self { event, kind }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.event, self.kind.group())
    }
}

/// The phase sequence of a run.
///
/// Module loading finishes before preprocessing is torn down, and reporters
/// load only once the other kinds completed; framework exit tells them the
/// results are final before they exit themselves.
pub const DEFAULT_PHASES: [LifecyclePhase; 8] = [
    LifecyclePhase::new(HookEvent::OnLoad, PluginKind::Preprocessor),
    LifecyclePhase::new(HookEvent::OnLoad, PluginKind::Framework),
    LifecyclePhase::new(HookEvent::OnLoad, PluginKind::ModuleLoader),
    LifecyclePhase::new(HookEvent::OnExit, PluginKind::ModuleLoader),
    LifecyclePhase::new(HookEvent::OnExit, PluginKind::Preprocessor),
    LifecyclePhase::new(HookEvent::OnLoad, PluginKind::Reporter),
    LifecyclePhase::new(HookEvent::OnExit, PluginKind::Framework),
    LifecyclePhase::new(HookEvent::OnExit, PluginKind::Reporter),
];

/// The `(source, filename, key)` triple a preprocessor receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    /// Source text.
    pub source: String,
    /// File name the source is known by.
    pub filename: String,
    /// Cache key computed by the module loader.
    pub key: String,
}

impl FileSource {
    /// Creates a triple.
    pub fn new(
        source: impl Into<String>,
        filename: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            filename: filename.into(),
            key: key.into(),
        }
    }

    /// Produces the triple the next preprocessor receives.
    pub fn apply(self, outcome: FileLoadOutcome) -> Self {
        match outcome {
            FileLoadOutcome::Unchanged => self,
            FileLoadOutcome::Source(source) => Self { source, ..self },
            FileLoadOutcome::Rewrite(rewrite) => Self {
                source: rewrite.source.unwrap_or(self.source),
                filename: rewrite.filename.unwrap_or(self.filename),
                key: rewrite.key.unwrap_or(self.key),
            },
        }
    }
}

/// Partial replacement of a [`FileSource`]; `None` fields pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRewrite {
    /// Replacement source text.
    pub source: Option<String>,
    /// Replacement file name.
    pub filename: Option<String>,
    /// Replacement key.
    pub key: Option<String>,
}

impl FileRewrite {
    /// Sets the replacement source.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the replacement file name.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the replacement key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// What an `onFileLoad` hook returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLoadOutcome {
    /// Leave the triple as it is.
    Unchanged,
    /// Replace the source only.
    Source(String),
    /// Replace whichever fields are set.
    Rewrite(FileRewrite),
}

impl From<String> for FileLoadOutcome {
    fn from(source: String) -> Self {
        Self::Source(source)
    }
}

impl From<&str> for FileLoadOutcome {
    fn from(source: &str) -> Self {
        Self::Source(source.to_string())
    }
}

impl From<FileRewrite> for FileLoadOutcome {
    fn from(rewrite: FileRewrite) -> Self {
        Self::Rewrite(rewrite)
    }
}

impl From<()> for FileLoadOutcome {
    fn from(_: ()) -> Self {
        Self::Unchanged
    }
}
