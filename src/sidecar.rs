//! Per-document JSON sidecars.
//!
//! Two directories under the source root hold extra data for individual
//! documents, one `<uid>.json` file each:
//!
//! ```text
//! source/
//! ├── .flubs/
//! │   └── blur.json       # [Flub]: property table appended after the content
//! └── .meta/
//!     └── blur.json       # NodeMetadata: rendered into %%NODEDATA%%
//! ```
//!
//! Files are keyed by their lowercased stem and matched against document
//! identifiers case-insensitively. A file that cannot be read or parsed is
//! reported as a warning and skipped; a missing directory is simply empty.
//! Both directories start with `.`, so collection never treats them as
//! content.

use crate::config::SidecarConfig;
use crate::naming::humanize;
use crate::registry::Registry;
use maud::html;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sidecar {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One row of a property table. Groups start a titled block; a plain entry
/// may list its choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Flub {
    pub name: String,
    pub description: Option<String>,
    pub is_group: bool,
    pub flubs: Option<Vec<Flub>>,
}

impl Flub {
    fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    fn choices(&self) -> &[Flub] {
        self.flubs.as_deref().unwrap_or_default()
    }

    /// At least one choice carries a description worth listing.
    fn has_described_choices(&self) -> bool {
        self.choices().iter().any(|c| !c.description().is_empty())
    }
}

/// Descriptive data of one node page. Fields not listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeMetadata {
    pub name: String,
    pub description: String,
    pub family: String,
    pub toolbox: String,
    pub short_code: String,
    pub accumulation_type: Option<String>,
    pub requires_baking: bool,
    pub can_create_ports: bool,
}

/// Every sidecar of the corpus, keyed by lowercase identifier.
#[derive(Debug, Clone, Default)]
pub struct Sidecars {
    flubs: HashMap<String, Vec<Flub>>,
    metadata: HashMap<String, NodeMetadata>,
    /// Files that could not be read or parsed.
    pub warnings: Vec<String>,
}

impl Sidecars {
    /// Load both sidecar directories below `source_root`.
    pub fn load(source_root: &Path, config: &SidecarConfig) -> Self {
        let mut warnings = Vec::new();
        let mut flubs: HashMap<String, Vec<Flub>> =
            load_dir(&source_root.join(&config.flubs_dir), &mut warnings);
        flubs.retain(|_, rows| !rows.is_empty());
        let metadata = load_dir(&source_root.join(&config.meta_dir), &mut warnings);
        debug!(
            flubs = flubs.len(),
            metadata = metadata.len(),
            "loaded sidecars"
        );
        Self {
            flubs,
            metadata,
            warnings,
        }
    }

    pub fn flubs(&self, id: &str) -> Option<&[Flub]> {
        self.flubs.get(&id.to_lowercase()).map(Vec::as_slice)
    }

    pub fn metadata(&self, id: &str) -> Option<&NodeMetadata> {
        self.metadata.get(&id.to_lowercase())
    }

    /// Sidecar keys that name no registered document, sorted.
    pub fn orphans(&self, registry: &Registry) -> Vec<String> {
        let mut orphans: Vec<String> = self
            .flubs
            .keys()
            .chain(self.metadata.keys())
            .filter(|key| registry.get(key).is_none())
            .cloned()
            .collect();
        orphans.sort();
        orphans.dedup();
        orphans
    }
}

fn load_dir<T: DeserializeOwned>(dir: &Path, warnings: &mut Vec<String>) -> HashMap<String, T> {
    let mut loaded = HashMap::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return loaded,
        Err(e) => {
            warnings.push(format!("{}: {e}", dir.display()));
            return loaded;
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")))
        .collect();
    files.sort();

    for path in files {
        let Some(key) = path.file_stem().map(|s| s.to_string_lossy().to_lowercase()) else {
            continue;
        };
        match read_json(&path) {
            Ok(value) => {
                loaded.insert(key, value);
            }
            Err(e) => {
                warn!("{e}");
                warnings.push(e.to_string());
            }
        }
    }
    loaded
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SidecarError> {
    let text = fs::read_to_string(path).map_err(|source| SidecarError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SidecarError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Property table for a node page.
///
/// The node title heads the table unless the first row is a group (or is
/// described as `T`, which marks a table that brings its own heading).
pub fn flub_table(title: &str, flubs: &[Flub]) -> String {
    let Some(first) = flubs.first() else {
        return String::new();
    };
    let titled = first.description() != "T" && !first.is_group;

    html! {
        table.properties-table {
            tbody {
                @if titled {
                    tr { td colspan="2" class="head" { span.title { (title) } } }
                }
                @for flub in flubs {
                    @if flub.is_group {
                        tr {
                            td colspan="2" class="head" {
                                span.title { (humanize(&flub.name)) }
                                span.title-desc { (flub.description()) }
                            }
                        }
                    } @else if flub.has_described_choices() {
                        tr {
                            td { (humanize(&flub.name)) }
                            td {
                                (flub.description())
                                div.param-spacer {}
                                @for choice in flub.choices() {
                                    span.choice { (humanize(&choice.name)) }
                                    span.choice-description { (choice.description()) }
                                }
                            }
                        }
                    } @else {
                        tr {
                            td { (humanize(&flub.name)) }
                            td { (flub.description()) }
                        }
                    }
                }
            }
        }
    }
    .into_string()
}

/// Markdown source of a node's data block: an HTML summary line, include
/// directives for the optional notes, and a closing rule. The caller expands
/// the includes and renders the result.
pub fn node_data_source(meta: &NodeMetadata, config: &SidecarConfig) -> String {
    let mut out = html! {
        div.node-info.d-flex.justify-content-between {
            div.toolbox.d-flex { (meta.toolbox) " › " (meta.family) }
            div.shortcut.d-flex { "Shortcode " kbd { (meta.short_code) } }
        }
        span.description { (meta.description) }
        @if let Some(accumulation) = &meta.accumulation_type {
            div.accumulation { (accumulation) }
        }
    }
    .into_string();
    out.push('\n');

    if meta.can_create_ports {
        out.push_str(&format!("\n{{% include \"{}\" %}}\n", config.ports_include));
    }
    if meta.requires_baking {
        out.push_str(&format!("\n{{% include \"{}\" %}}\n", config.baking_include));
    }
    out.push_str("\n<hr>\n");
    out
}
