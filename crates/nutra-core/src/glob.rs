//! Glob resolver.
//!
//! Expands shell-style path patterns into a deduplicated file set and
//! matches single paths against patterns. Patterns are compiled into a
//! [`Regex`] together with their literal walk root, so expansion only
//! walks the part of the tree a pattern can reach.
//!
//! Supported syntax: `*`, `?`, `**` as a whole segment, `[...]` classes
//! (negated with `!` or `^`), `{a,b}` alternation and `\` escapes.
//!
//! Path segments starting with `.` only match pattern segments that start
//! with a literal `.`; wildcards never reach into hidden files or
//! directories.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ErrorKind, NutraError};
use crate::result::NutraResult;

/// Characters that make a path segment a pattern rather than a literal.
const META_CHARS: [char; 4] = ['*', '?', '[', '{'];

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    /// The pattern as written.
    raw: String,
    /// Anchored regex equivalent.
    regex: Regex,
    /// Longest literal directory prefix.
    root: PathBuf,
    /// Walk depth below `root`, unbounded when the pattern contains `**`.
    max_depth: Option<usize>,
    /// Pattern segments written with a leading `.`.
    hidden: Vec<Regex>,
}

impl GlobPattern {
    /// Compiles a pattern.
    pub fn new(pattern: &str) -> NutraResult<Self> {
        let normalized = to_slash(pattern);
        let regex = compile(pattern, &normalized)?;

        let segments: Vec<&str> = normalized.split('/').collect();
        let hidden = segments
            .iter()
            .filter(|segment| is_hidden(segment))
            .map(|segment| compile(pattern, segment))
            .collect::<NutraResult<Vec<_>>>()?;
        let literal = segments
            .iter()
            .position(|segment| segment.contains(META_CHARS))
            .unwrap_or(segments.len());

        let root = match literal {
            1 if normalized.starts_with('/') => PathBuf::from("/"),
            _ => PathBuf::from(segments[..literal].join("/")),
        };

        let rest = &segments[literal..];
        let max_depth = if rest.iter().any(|segment| segment.contains("**")) {
            None
        } else {
            Some(rest.len())
        };

        Ok(Self {
            raw: pattern.to_string(),
            regex,
            root,
            max_depth,
            hidden,
        })
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the literal directory the pattern is anchored to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` satisfies this pattern.
    pub fn is_match(&self, path: impl AsRef<Path>) -> bool {
        let path = to_slash(&path.as_ref().to_string_lossy());
        self.regex.is_match(&path)
            && path
                .split('/')
                .filter(|segment| is_hidden(segment))
                .all(|segment| self.allows_hidden(segment))
    }

    fn allows_hidden(&self, segment: &str) -> bool {
        self.hidden.iter().any(|regex| regex.is_match(segment))
    }

    /// Walks the filesystem and returns every regular file matching the
    /// pattern. A missing root yields nothing.
    pub fn walk(&self) -> Vec<PathBuf> {
        let relative = self.root.as_os_str().is_empty();
        let walk_root = if relative {
            PathBuf::from(".")
        } else {
            self.root.clone()
        };

        if !walk_root.exists() {
            debug!(pattern = %self.raw, root = %walk_root.display(), "Glob root does not exist");
            return Vec::new();
        }

        let mut walker = WalkDir::new(&walk_root).follow_links(true);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        walker
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                entry.depth() == 0 || !is_hidden(&name) || self.allows_hidden(&name)
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let path = entry.into_path();
                if relative {
                    path.strip_prefix(".").map(Path::to_path_buf).unwrap_or(path)
                } else {
                    path
                }
            })
            .filter(|path| self.is_match(path))
            .collect()
    }
}

/// An ordered collection of patterns; a path matches when any pattern does.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<GlobPattern>,
}

impl PatternSet {
    /// Compiles every pattern, failing on the first invalid one.
    pub fn new<I, S>(patterns: I) -> NutraResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| GlobPattern::new(p.as_ref()))
            .collect::<NutraResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether `path` satisfies at least one pattern. Patterns are tried in
    /// order and the first match wins.
    pub fn is_match(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.patterns.iter().any(|pattern| pattern.is_match(path))
    }

    /// Appends a compiled pattern.
    pub fn push(&mut self, pattern: GlobPattern) {
        self.patterns.push(pattern);
    }

    /// Returns the compiled patterns.
    pub fn patterns(&self) -> &[GlobPattern] {
        &self.patterns
    }

    /// Whether the set holds no pattern.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Expands every pattern and unions the results.
///
/// Patterns matching nothing contribute nothing; emptiness of the whole
/// set is judged by the caller.
pub fn expand(patterns: &[String]) -> NutraResult<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    for pattern in patterns {
        let compiled = GlobPattern::new(pattern)?;
        let found = compiled.walk();
        debug!(pattern = %pattern, matched = found.len(), "Expanded glob pattern");
        files.extend(found);
    }
    Ok(files)
}

/// Whether `path` matches at least one of `patterns`. Invalid patterns
/// never match.
pub fn matches(patterns: &[String], path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    patterns.iter().any(|pattern| {
        GlobPattern::new(pattern)
            .map(|compiled| compiled.is_match(path))
            .unwrap_or(false)
    })
}

/// Resolves each relative pattern against `base_path`. Absolute patterns
/// are kept; `.` and `..` segments are folded lexically.
pub fn normalize(files: &[String], base_path: &Path) -> Vec<String> {
    files
        .iter()
        .map(|file| clean(&base_path.join(file)).to_string_lossy().into_owned())
        .collect()
}

/// Folds `.` and `..` components without touching the filesystem.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn compile(pattern: &str, glob: &str) -> NutraResult<Regex> {
    Regex::new(&translate(glob)).map_err(|e| {
        NutraError::with_source(
            ErrorKind::Configuration,
            format!("Invalid glob pattern '{pattern}'"),
            e,
        )
    })
}

fn is_hidden(segment: &str) -> bool {
    segment.starts_with('.') && segment != "." && segment != ".."
}

fn to_slash(path: &str) -> String {
    if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path.to_string()
    }
}

/// Translates a `/`-separated glob into an anchored regex.
fn translate(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let len = chars.len();
    let mut re = String::with_capacity(len * 2 + 2);
    let mut brace_depth = 0usize;
    let mut i = 0;

    re.push('^');
    while i < len {
        let c = chars[i];
        match c {
            '*' => {
                let start = i;
                while i < len && chars[i] == '*' {
                    i += 1;
                }
                let whole_segment = i - start > 1
                    && (start == 0 || chars[start - 1] == '/')
                    && (i == len || chars[i] == '/');
                if !whole_segment {
                    re.push_str("[^/]*");
                } else if i == len {
                    re.push_str(".*");
                } else {
                    // swallow the separator, `**/` may match zero segments
                    re.push_str("(?:[^/]*/)*");
                    i += 1;
                }
                continue;
            }
            '?' => re.push_str("[^/]"),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    re.push_str(&translate_class(&chars[i + 1..end]));
                    i = end;
                }
                None => re.push_str("\\["),
            },
            '{' if chars[i + 1..].contains(&'}') => {
                brace_depth += 1;
                re.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                re.push(')');
            }
            ',' if brace_depth > 0 => re.push('|'),
            '\\' if i + 1 < len => {
                i += 1;
                re.push_str(&regex::escape(&chars[i].to_string()));
            }
            _ => re.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    re.push('$');
    re
}

/// Index of the `]` closing the class opened at `open`.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if j < chars.len() && matches!(chars[j], '!' | '^') {
        j += 1;
    }
    // a leading `]` is a member, not the terminator
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

fn translate_class(body: &[char]) -> String {
    let mut class = String::from("[");
    let mut members = body;
    let negated = matches!(members.first(), Some('!' | '^'));
    if negated {
        class.push('^');
        members = &members[1..];
    }
    for &c in members {
        if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^') {
            class.push('\\');
        }
        class.push(c);
    }
    if negated {
        class.push('/');
    }
    class.push(']');
    class
}
