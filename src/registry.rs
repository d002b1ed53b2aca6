//! Document collection and the frozen page registry.
//!
//! Stage 1 of the build. Each hive's source tree is walked and every Markdown
//! file becomes a [`Document`] built from its header alone. Bodies are not
//! read here.
//!
//! ## Collection rules
//!
//! - Only `.md` files are collected; names starting with `.` or `_` are
//!   skipped together with everything below them.
//! - Home hives contribute only the files at the top of their source
//!   directory.
//! - A document needs `title` and `uid` header fields. Files without them,
//!   or that cannot be read, are rejected: logged, counted, and left out.
//!
//! ## Freezing
//!
//! [`Registry::freeze`] merges the collections of every hive and checks that
//! identifiers are unique across the whole corpus (case-insensitively). Any
//! collision fails the build before anything is written. The resulting
//! registry is immutable and is shared by reference with the parallel stage.

use crate::header::{Header, HeaderError, ensure_title};
use crate::naming::{self, is_reserved_name};
use crate::types::{Document, Hive, RecentChange};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("hive source not found: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("duplicate identifiers:\n{}", format_duplicates(.ids))]
    DuplicateIdentifier { ids: Vec<DuplicateId> },
}

/// One identifier claimed by more than one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId {
    pub id: String,
    pub paths: Vec<PathBuf>,
}

impl fmt::Display for DuplicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<_> = self.paths.iter().map(|p| p.display().to_string()).collect();
        write!(f, "  {} ({})", self.id, paths.join(", "))
    }
}

fn format_duplicates(ids: &[DuplicateId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A file that could not be turned into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of walking one hive.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub hive: String,
    pub documents: Vec<Document>,
    pub rejected: Vec<Rejected>,
}

/// Settings shared by every hive's collection.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub index_file: String,
    pub page_extension: String,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            index_file: "index.md".to_string(),
            page_extension: "html".to_string(),
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !is_reserved_name(&entry.file_name().to_string_lossy())
}

/// Markdown files of a hive in lexicographic walk order.
fn markdown_files(hive: &Hive) -> Result<Vec<PathBuf>, RegistryError> {
    if !hive.source.is_dir() {
        return Err(RegistryError::MissingSource(hive.source.clone()));
    }
    let max_depth = if hive.is_home { 1 } else { usize::MAX };
    let mut files = Vec::new();
    for entry in WalkDir::new(&hive.source)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_visible)
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Walk one hive and build a document per Markdown file.
pub fn collect(hive: &Hive, options: &CollectOptions) -> Result<Collection, RegistryError> {
    let mut collection = Collection {
        hive: hive.name.clone(),
        ..Collection::default()
    };

    for path in markdown_files(hive)? {
        match read_document(hive, &path, options) {
            Ok(doc) => {
                debug!(id = %doc.id, path = %path.display(), "collected");
                collection.documents.push(doc);
            }
            Err(reason) => {
                warn!(path = %path.display(), %reason, "document rejected");
                collection.rejected.push(Rejected { path, reason });
            }
        }
    }
    Ok(collection)
}

fn read_document(hive: &Hive, path: &Path, options: &CollectOptions) -> Result<Document, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("unreadable: {e}"))?;
    let header = Header::split(&text)
        .map(|(header, _)| header)
        .map_err(|e| e.to_string())?;
    document_from_header(hive, path, &header, options)
        .map_err(|e| e.to_string())
        .map(|mut doc| {
            doc.modified_at = modified_at(path);
            doc
        })
}

/// Build a [`Document`] from an already-parsed header.
pub fn document_from_header(
    hive: &Hive,
    path: &Path,
    header: &Header,
    options: &CollectOptions,
) -> Result<Document, HeaderError> {
    let title = header.require("title")?.to_string();
    let id = header.require("uid")?.to_string();
    let relative_path = path.strip_prefix(&hive.source).unwrap_or(path).to_path_buf();

    Ok(Document {
        destination: hive.destination.join(&relative_path),
        href: naming::page_url(
            &hive.url,
            &relative_path,
            &options.index_file,
            &options.page_extension,
        ),
        path: path.to_path_buf(),
        relative_path,
        id,
        title,
        hidden: header.is("show", "no"),
        starts_section: header.flag("section"),
        icon: header.non_empty("icon").map(str::to_string),
        order: header.order(),
        modified_at: None,
        hive: hive.name.clone(),
    })
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Add a `title:` header to every Markdown file of a hive that lacks one,
/// defaulting to the humanized file stem. Returns the number of files changed.
pub fn ensure_titles(hive: &Hive) -> Result<usize, RegistryError> {
    let mut changed = 0;
    for path in markdown_files(hive)? {
        let text = fs::read_to_string(&path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(updated) = ensure_title(&text, &naming::humanize(&stem), false) {
            fs::write(&path, updated)?;
            debug!(path = %path.display(), "added title");
            changed += 1;
        }
    }
    Ok(changed)
}

// ============================================================================
// Frozen registry
// ============================================================================

/// Immutable index of every accepted document in the corpus.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    documents: Vec<Document>,
    rejected: Vec<Rejected>,
    by_id: HashMap<String, usize>,
    by_destination: HashMap<PathBuf, usize>,
}

impl Registry {
    /// Merge per-hive collections and check identifier uniqueness.
    pub fn freeze(collections: Vec<Collection>) -> Result<Self, RegistryError> {
        let mut documents = Vec::new();
        let mut rejected = Vec::new();
        for collection in collections {
            documents.extend(collection.documents);
            rejected.extend(collection.rejected);
        }

        let mut claims: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for doc in &documents {
            claims
                .entry(doc.id.to_lowercase())
                .or_default()
                .push(doc.path.clone());
        }
        let duplicates: Vec<DuplicateId> = claims
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(id, mut paths)| {
                paths.sort();
                DuplicateId { id, paths }
            })
            .collect();
        if !duplicates.is_empty() {
            return Err(RegistryError::DuplicateIdentifier { ids: duplicates });
        }

        let mut registry = Registry {
            rejected,
            ..Registry::default()
        };
        for (i, doc) in documents.iter().enumerate() {
            registry.by_id.insert(doc.id.to_lowercase(), i);
            registry.by_destination.insert(doc.destination.clone(), i);
        }
        registry.documents = documents;
        Ok(registry)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn rejected(&self) -> &[Rejected] {
        &self.rejected
    }

    /// Look up by identifier (case-insensitive).
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id
            .get(&id.to_lowercase())
            .map(|&i| &self.documents[i])
    }

    /// Look up by staged Markdown path (`<hive destination>/<relative path>`).
    pub fn by_destination(&self, path: &Path) -> Option<&Document> {
        self.by_destination.get(path).map(|&i| &self.documents[i])
    }

    /// Documents of one hive, in collection order.
    pub fn in_hive<'a>(&'a self, hive: &'a str) -> impl Iterator<Item = &'a Document> + 'a {
        self.documents.iter().filter(move |d| d.hive == hive)
    }

    /// Most recently modified visible documents, newest first.
    pub fn recent_changes(&self, limit: usize) -> Vec<RecentChange> {
        let mut dated: Vec<_> = self
            .documents
            .iter()
            .filter(|d| !d.hidden)
            .filter_map(|d| d.modified_at.map(|at| (at, d)))
            .collect();
        dated.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        dated
            .into_iter()
            .take(limit)
            .map(|(modified_at, d)| RecentChange {
                id: d.id.clone(),
                title: d.title.clone(),
                href: d.href.clone(),
                hive: d.hive.clone(),
                modified_at,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
