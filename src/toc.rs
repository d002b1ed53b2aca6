//! Navigation tree (table of contents) for one hive.
//!
//! The tree is a pure function of the hive's directory snapshot: folder
//! layout, document headers and optional folder manifests. It is built by a
//! single depth-first walk and serialized into `TOC_<short_name>.js`.
//!
//! ## Per-directory rules
//!
//! ```text
//! docs/
//! ├── index.md          → "Home" leaf (root landing keeps its own title)
//! ├── folders.txt       → orders and retitles subfolders
//! ├── faq.md            → leaf
//! └── guide/
//!     ├── index.md      → "Overview" leaf, first child of the "Guide" group
//!     ├── setup.md      → leaf (order: 1)
//!     └── tips.md       → leaf
//! ```
//!
//! 1. The landing document (`index.md`) of the hive root is a leaf titled by
//!    its header. In a subdirectory with other content it becomes the
//!    "Overview" child; a subdirectory with nothing else collapses to a
//!    clickable leaf.
//! 2. Other documents, minus hidden ones (`show: no`), sort by `order`
//!    (documents without one last), then title, then file name.
//! 3. Subdirectories sort by manifest position, then name.
//!
//! Group titles come from the manifest, then the landing title, then the
//! humanized folder name. Groups are never clickable and empty groups are
//! pruned. Names starting with `.` or `_` are ignored.

use crate::header::Header;
use crate::manifest::FolderManifest;
use crate::naming::{humanize, is_reserved_name, normalize_base_url, page_url};
use crate::types::NavNode;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum TocError {
    #[error("hive root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct TocOptions {
    pub manifest_file: String,
    pub index_file: String,
    pub page_extension: String,
    pub overview_title: String,
}

impl Default for TocOptions {
    fn default() -> Self {
        Self {
            manifest_file: "folders.txt".to_string(),
            index_file: "index.md".to_string(),
            page_extension: "html".to_string(),
            overview_title: "Overview".to_string(),
        }
    }
}

/// A built navigation tree plus what the walk noticed along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    pub nodes: Vec<NavNode>,
    /// Directories visited below the root.
    pub sections: usize,
    /// Advisories: unreadable manifests, documents or directories.
    pub warnings: Vec<String>,
}

/// Build the navigation tree for the hive rooted at `root`.
pub fn build_toc(root: &Path, base_url: &str, options: &TocOptions) -> Result<Toc, TocError> {
    if !root.is_dir() {
        return Err(TocError::RootNotFound(root.to_path_buf()));
    }
    let mut walker = Walker {
        root,
        base: normalize_base_url(base_url),
        options,
        sections: 0,
        warnings: Vec::new(),
    };
    let listing = walker.list(root)?;
    let nodes = walker.directory_children(root, listing, true);
    Ok(Toc {
        nodes,
        sections: walker.sections,
        warnings: walker.warnings,
    })
}

/// The JavaScript artifact: `<var> = <json>;`.
pub fn to_javascript(nodes: &[NavNode], variable: &str) -> Result<String, TocError> {
    Ok(format!("{variable} = {};", serde_json::to_string(nodes)?))
}

/// The artifact published by home hives.
pub fn null_javascript(variable: &str) -> String {
    format!("{variable} = null;")
}

/// Header fields the TOC cares about.
struct PageMeta {
    title: String,
    file_name: String,
    url: String,
    icon: Option<String>,
    order: Option<i64>,
    section: bool,
    hidden: bool,
}

/// Visible contents of one directory.
#[derive(Default)]
struct Listing {
    landing: Option<PathBuf>,
    pages: Vec<PathBuf>,
    subdirs: Vec<(String, PathBuf)>,
}

struct Walker<'a> {
    root: &'a Path,
    base: String,
    options: &'a TocOptions,
    sections: usize,
    warnings: Vec<String>,
}

impl Walker<'_> {
    fn list(&self, dir: &Path) -> std::io::Result<Listing> {
        let mut listing = Listing::default();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_reserved_name(&name) {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                listing.subdirs.push((name, path));
            } else if name.eq_ignore_ascii_case(&self.options.index_file) {
                listing.landing = Some(path);
            } else if path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("md"))
            {
                listing.pages.push(path);
            }
        }
        Ok(listing)
    }

    fn read_meta(&mut self, path: &Path) -> Option<PageMeta> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                self.warn(format!("{}: {e}", path.display()));
                return None;
            }
        };
        let header = Header::parse_optional(&text);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative = path.strip_prefix(self.root).unwrap_or(path);

        Some(PageMeta {
            title: header
                .non_empty("title")
                .map(str::to_string)
                .unwrap_or_else(|| humanize(&stem)),
            url: page_url(
                &self.base,
                relative,
                &self.options.index_file,
                &self.options.page_extension,
            ),
            file_name,
            icon: header.non_empty("icon").map(str::to_string),
            order: header.order(),
            section: header.flag("section"),
            hidden: header.is("show", "no"),
        })
    }

    fn manifest(&mut self, dir: &Path) -> FolderManifest {
        FolderManifest::read(dir, &self.options.manifest_file).unwrap_or_else(|e| {
            self.warn(e.to_string());
            FolderManifest::default()
        })
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Ordered children of a directory: optional root landing leaf, pages,
    /// then subdirectory nodes.
    fn directory_children(&mut self, dir: &Path, listing: Listing, is_root: bool) -> Vec<NavNode> {
        let mut nodes = Vec::new();

        if is_root
            && let Some(landing) = &listing.landing
            && let Some(meta) = self.read_meta(landing).filter(|m| !m.hidden)
        {
            nodes.push(leaf(meta));
        }

        let mut pages: Vec<PageMeta> = listing
            .pages
            .iter()
            .filter_map(|p| self.read_meta(p))
            .filter(|m| !m.hidden)
            .collect();
        pages.sort_by_cached_key(|m| {
            (
                m.order.is_none(),
                m.order.unwrap_or(0),
                m.title.to_lowercase(),
                m.file_name.to_lowercase(),
            )
        });
        nodes.extend(pages.into_iter().map(leaf));

        let manifest = self.manifest(dir);
        let mut subdirs = listing.subdirs;
        subdirs.sort_by_cached_key(|(name, _)| manifest.sort_key(name));
        for (name, path) in subdirs {
            if let Some(node) = self.folder_node(&name, &path, &manifest) {
                nodes.push(node);
            }
        }
        nodes
    }

    fn folder_node(&mut self, name: &str, dir: &Path, parent: &FolderManifest) -> Option<NavNode> {
        self.sections += 1;
        let listing = match self.list(dir) {
            Ok(listing) => listing,
            Err(e) => {
                self.warn(format!("{}: {e}", dir.display()));
                return None;
            }
        };

        let landing = listing
            .landing
            .clone()
            .and_then(|p| self.read_meta(&p))
            .filter(|m| !m.hidden);
        let children = self.directory_children(dir, listing, false);

        let entry = parent.entry(name);
        let title = entry
            .and_then(|e| e.title.clone())
            .or_else(|| landing.as_ref().map(|m| m.title.clone()))
            .unwrap_or_else(|| humanize(name));
        let icon = entry
            .and_then(|e| e.icon.clone())
            .or_else(|| landing.as_ref().and_then(|m| m.icon.clone()));
        let section = landing.as_ref().is_some_and(|m| m.section);

        match landing {
            Some(meta) if children.is_empty() => Some(
                NavNode::leaf(title, meta.url)
                    .with_icon(icon)
                    .with_section(section),
            ),
            None if children.is_empty() => None,
            landing => {
                let mut children = children;
                if let Some(meta) = landing {
                    children.insert(0, NavNode::leaf(self.options.overview_title.clone(), meta.url));
                }
                Some(
                    NavNode::group(title, children)
                        .with_icon(icon)
                        .with_section(section),
                )
            }
        }
    }
}

fn leaf(meta: PageMeta) -> NavNode {
    NavNode::leaf(meta.title, meta.url)
        .with_icon(meta.icon)
        .with_section(meta.section)
}
