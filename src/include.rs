//! Include directive expansion.
//!
//! A document can pull in shared fragments with
//!
//! ```text
//! {% include "snippets/warning.md" %}
//! {% include '/shared/footer.md' %}
//! ```
//!
//! Paths with a leading `/` (or `\`) resolve against the content root, other
//! relative paths against the including document's directory, and
//! drive-qualified absolute paths are used as-is. `.` and `..` are normalized
//! lexically.
//!
//! Expansion runs in rounds. Each round rescans the whole text and replaces
//! every directive, so nested includes are picked up by the next round. The
//! loop stops after `max_depth` rounds or after a round that substitutes
//! nothing. Directives still present after the last round are left in the
//! text, which is what bounds self-inclusion.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{%\s*include\s+(?:"([^"]+)"|'([^']+)')\s*%\}"#)
        .expect("include directive pattern is valid")
});

#[derive(Error, Debug)]
pub enum IncludeError {
    #[error("include not found: \"{directive}\" (resolved to {})", resolved.display())]
    NotFound { directive: String, resolved: PathBuf },
    #[error("failed to read include {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to do with a directive whose file is missing or unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeMode {
    /// Keep the directive verbatim and log a warning.
    #[default]
    Lenient,
    /// Fail the document.
    Strict,
}

/// Expands include directives for one site.
#[derive(Debug, Clone)]
pub struct IncludeExpander {
    content_root: PathBuf,
    max_depth: usize,
    mode: IncludeMode,
}

impl IncludeExpander {
    pub fn new(content_root: impl Into<PathBuf>, max_depth: usize, mode: IncludeMode) -> Self {
        Self {
            content_root: content_root.into(),
            max_depth,
            mode,
        }
    }

    /// Expand every directive in `text`, resolving relative paths against
    /// `base_dir`.
    ///
    /// File contents are cached by resolved path for the duration of this
    /// call only.
    pub fn expand(&self, text: &str, base_dir: &Path) -> Result<String, IncludeError> {
        let mut cache: HashMap<PathBuf, Option<String>> = HashMap::new();
        let mut current = text.to_string();

        for round in 1..=self.max_depth {
            let mut substituted = 0usize;
            let mut out = String::with_capacity(current.len());
            let mut last = 0;

            for caps in DIRECTIVE.captures_iter(&current) {
                let Some(whole) = caps.get(0) else { continue };
                let raw = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().trim())
                    .unwrap_or_default();

                out.push_str(&current[last..whole.start()]);
                last = whole.end();

                let resolved = self.resolve(raw, base_dir);
                match self.load(raw, &resolved, &mut cache)? {
                    Some(content) => {
                        out.push_str(content);
                        substituted += 1;
                    }
                    None => out.push_str(whole.as_str()),
                }
            }

            if substituted == 0 {
                return Ok(current);
            }
            out.push_str(&current[last..]);
            debug!(round, substituted, "expanded includes");
            current = out;
        }

        if DIRECTIVE.is_match(&current) {
            debug!(
                max_depth = self.max_depth,
                "include depth exhausted, leaving remaining directives unexpanded"
            );
        }
        Ok(current)
    }

    /// Resolve a directive path to a filesystem location.
    pub fn resolve(&self, raw: &str, base_dir: &Path) -> PathBuf {
        let portable = raw.replace('\\', "/");
        if let Some(rooted) = portable.strip_prefix('/') {
            return normalize_path(&self.content_root.join(rooted.trim_start_matches('/')));
        }
        let as_path = Path::new(&portable);
        if as_path.is_absolute() {
            normalize_path(as_path)
        } else {
            normalize_path(&base_dir.join(as_path))
        }
    }

    fn load<'c>(
        &self,
        raw: &str,
        resolved: &Path,
        cache: &'c mut HashMap<PathBuf, Option<String>>,
    ) -> Result<Option<&'c str>, IncludeError> {
        if !cache.contains_key(resolved) {
            let content = match fs::read_to_string(resolved) {
                Ok(content) => Some(content),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    if self.mode == IncludeMode::Strict {
                        return Err(IncludeError::NotFound {
                            directive: raw.to_string(),
                            resolved: resolved.to_path_buf(),
                        });
                    }
                    warn!(include = raw, resolved = %resolved.display(), "include not found");
                    None
                }
                Err(source) => {
                    if self.mode == IncludeMode::Strict {
                        return Err(IncludeError::Read {
                            path: resolved.to_path_buf(),
                            source,
                        });
                    }
                    warn!(include = raw, error = %source, "include unreadable");
                    None
                }
            };
            cache.insert(resolved.to_path_buf(), content);
        }
        Ok(cache.get(resolved).and_then(|c| c.as_deref()))
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
