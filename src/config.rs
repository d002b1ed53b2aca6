//! Site configuration module.
//!
//! Handles loading, validating, and merging `hivedoc.toml`. Stock defaults are
//! the base layer; the user file only needs the keys it wants to override.
//!
//! ## Config File Location
//!
//! ```text
//! project/
//! ├── hivedoc.toml         # Site config (overrides stock defaults)
//! ├── source/              # source_root: one folder per hive
//! │   ├── index.md
//! │   └── docs/
//! └── staging/             # staging_root: rendered output
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! root = "."                       # Project root, other paths relative to it
//! source_root = "source"           # Authoring tree
//! staging_root = "staging"         # Rendered output
//! template = ""                    # Page shell file (empty = built-in)
//! page_extension = "html"          # Extension of rendered pages
//! toc_variable = "window.SITE_TOC" # Global assigned by TOC scripts
//!
//! [includes]
//! max_depth = 2                    # Expansion rounds per document
//! strict = false                   # Missing include fails the document
//!
//! [toc]
//! manifest_file = "folders.txt"
//! index_file = "index.md"
//! overview_title = "Overview"
//!
//! [processing]
//! max_workers = 4                  # Omit for auto = CPU cores - 1
//!
//! [sidecars]
//! flubs_dir = ".flubs"             # <uid>.json property tables
//! meta_dir = ".meta"               # <uid>.json node metadata
//! ports_include = "/.data/includes/add-ports.md"
//! baking_include = "/.data/includes/must-be-baked.md"
//!
//! [[hives]]
//! name = "Docs"
//! short_name = "docs"
//! folder = "docs"                  # Relative to source_root and staging_root
//! url = "/docs"
//! is_home = false
//! ```
//!
//! Unknown keys are rejected to catch typos early. An overlay's `[[hives]]`
//! array replaces the stock array as a whole.

use crate::include::IncludeMode;
use crate::naming::normalize_base_url;
use crate::types::Hive;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "hivedoc.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `hivedoc.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Project root; relative paths below resolve against it.
    pub root: String,
    pub source_root: String,
    pub staging_root: String,
    /// Page shell template file. Empty selects the built-in shell.
    pub template: String,
    pub page_extension: String,
    pub toc_variable: String,
    pub includes: IncludesConfig,
    pub toc: TocConfig,
    pub processing: ProcessingConfig,
    pub sidecars: SidecarConfig,
    pub hives: Vec<HiveConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            source_root: "source".to_string(),
            staging_root: "staging".to_string(),
            template: String::new(),
            page_extension: "html".to_string(),
            toc_variable: "window.SITE_TOC".to_string(),
            includes: IncludesConfig::default(),
            toc: TocConfig::default(),
            processing: ProcessingConfig::default(),
            sidecars: SidecarConfig::default(),
            hives: vec![HiveConfig::default()],
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_extension.is_empty() || self.page_extension.contains(['.', '/', '\\']) {
            return Err(ConfigError::Validation(
                "page_extension must be a bare extension like \"html\"".into(),
            ));
        }
        if self.toc_variable.trim().is_empty() {
            return Err(ConfigError::Validation("toc_variable must not be empty".into()));
        }
        if self.toc.index_file.is_empty() || self.toc.manifest_file.is_empty() {
            return Err(ConfigError::Validation(
                "toc.index_file and toc.manifest_file must not be empty".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        if self.sidecars.flubs_dir.trim().is_empty() || self.sidecars.meta_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sidecars.flubs_dir and sidecars.meta_dir must not be empty".into(),
            ));
        }
        if self.hives.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[hives]] entry is required".into(),
            ));
        }

        let mut names = HashSet::new();
        let mut short_names = HashSet::new();
        for hive in &self.hives {
            if hive.name.trim().is_empty() || hive.short_name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "every hive needs a name and a short_name".into(),
                ));
            }
            if !names.insert(hive.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate hive name \"{}\"",
                    hive.name
                )));
            }
            if !short_names.insert(hive.short_name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate hive short_name \"{}\"",
                    hive.short_name
                )));
            }
        }
        Ok(())
    }

    /// Resolve the configured directories against `base` (the directory
    /// holding the config file).
    pub fn paths(&self, base: &Path) -> SitePaths {
        let root = base.join(&self.root);
        SitePaths {
            source_root: root.join(&self.source_root),
            staging_root: root.join(&self.staging_root),
            template: (!self.template.is_empty()).then(|| root.join(&self.template)),
            root,
        }
    }

    /// Materialize the configured hives with absolute source/destination
    /// directories and normalized base URLs.
    pub fn build_hives(&self, paths: &SitePaths) -> Vec<Hive> {
        self.hives
            .iter()
            .map(|hive| {
                let folder = hive.folder.trim_matches(['/', '\\']);
                let (source, destination) = if folder.is_empty() {
                    (paths.source_root.clone(), paths.staging_root.clone())
                } else {
                    (paths.source_root.join(folder), paths.staging_root.join(folder))
                };
                Hive {
                    name: hive.name.clone(),
                    short_name: hive.short_name.clone(),
                    source,
                    destination,
                    url: normalize_base_url(&hive.url),
                    is_home: hive.is_home,
                }
            })
            .collect()
    }
}

/// Directories resolved from a [`SiteConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub root: PathBuf,
    pub source_root: PathBuf,
    pub staging_root: PathBuf,
    pub template: Option<PathBuf>,
}

/// One `[[hives]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HiveConfig {
    pub name: String,
    pub short_name: String,
    /// Folder under `source_root` (and `staging_root`). Empty means the
    /// roots themselves.
    pub folder: String,
    pub url: String,
    /// Home hive: only the top directory is published, no navigation tree.
    pub is_home: bool,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            name: "Docs".to_string(),
            short_name: "docs".to_string(),
            folder: "docs".to_string(),
            url: "/docs".to_string(),
            is_home: false,
        }
    }
}

/// Include expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IncludesConfig {
    /// Maximum number of expansion rounds per document.
    pub max_depth: usize,
    /// When set, an include that cannot be found fails the document.
    pub strict: bool,
}

impl Default for IncludesConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            strict: false,
        }
    }
}

impl IncludesConfig {
    pub fn mode(&self) -> IncludeMode {
        if self.strict {
            IncludeMode::Strict
        } else {
            IncludeMode::Lenient
        }
    }
}

/// Navigation tree settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TocConfig {
    pub manifest_file: String,
    pub index_file: String,
    /// Title of the synthetic leaf that carries a group's landing page.
    pub overview_title: String,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            manifest_file: "folders.txt".to_string(),
            index_file: "index.md".to_string(),
            overview_title: "Overview".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel document workers.
    /// When absent, defaults to the number of CPU cores minus one.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Per-document JSON data kept beside the authoring tree.
///
/// Directories are relative to `source_root`; each `<uid>.json` file belongs
/// to the document with that identifier. Include paths are written into the
/// generated node data and resolve like any other include.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SidecarConfig {
    pub flubs_dir: String,
    pub meta_dir: String,
    /// Included when a node can create ports.
    pub ports_include: String,
    /// Included when a node must be baked.
    pub baking_include: String,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            flubs_dir: ".flubs".to_string(),
            meta_dir: ".meta".to_string(),
            ports_include: "/.data/includes/add-ports.md".to_string(),
            baking_include: "/.data/includes/must-be-baked.md".to_string(),
        }
    }
}

/// Resolve the effective worker count from config.
///
/// - `None` → `cores - 1`, at least 1
/// - `Some(n)` → `min(n, cores)`, at least 1
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.min(cores))
        .unwrap_or(cores.saturating_sub(1))
        .max(1)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `hivedoc.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# hivedoc Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Project root. The other paths are relative to it.
root = "."

# Authoring tree: one folder per hive.
source_root = "source"

# Rendered output.
staging_root = "staging"

# Page shell with %%CONTENT%%, %%TITLE%%, %%HIVE%%, %%HIVEPATH%%,
# %%SHORTNAME%%, %%HREF%%, %%SLUG%%, %%NODEDATA%%, %%NODEFAMILY%%,
# %%NODECATEGORY%% and %%V%% placeholders.
# Leave empty to use the built-in shell.
template = ""

# Extension of rendered pages (replaces the source ".md").
page_extension = "html"

# Global variable assigned by each TOC_<short_name>.js script.
toc_variable = "window.SITE_TOC"

# ---------------------------------------------------------------------------
# Includes: {% include "path" %}
# ---------------------------------------------------------------------------
[includes]
# Expansion rounds per document. Directives left after the last round stay
# in the text unexpanded.
max_depth = 2

# Fail the document when an include cannot be found. When false the
# directive is kept verbatim and a warning is logged.
strict = false

# ---------------------------------------------------------------------------
# Navigation tree
# ---------------------------------------------------------------------------
[toc]
# Optional per-directory manifest: name|title|icon per line.
manifest_file = "folders.txt"

# Landing document of a directory.
index_file = "index.md"

# Title of the leaf carrying a group's landing page.
overview_title = "Overview"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel document workers.
# Omit or comment out to auto-detect (= number of CPU cores - 1).
# max_workers = 4

# ---------------------------------------------------------------------------
# Sidecar data: <uid>.json files beside the authoring tree
# ---------------------------------------------------------------------------
[sidecars]
# Property tables appended after the page content. Relative to source_root.
flubs_dir = ".flubs"

# Node metadata rendered into %%NODEDATA%%. Relative to source_root.
meta_dir = ".meta"

# Included into the node data of nodes that can create ports.
ports_include = "/.data/includes/add-ports.md"

# Included into the node data of nodes that must be baked.
baking_include = "/.data/includes/must-be-baked.md"

# ---------------------------------------------------------------------------
# Hives. Repeat the block for each hive.
# ---------------------------------------------------------------------------
[[hives]]
name = "Docs"
short_name = "docs"
folder = "docs"
url = "/docs"
is_home = false
"##
}
