//! Per-directory folder manifests (`folders.txt`).
//!
//! A manifest fixes the order of a directory's subfolders and can override
//! their display title and icon:
//!
//! ```text
//! # name|title|icon
//! getting-started|Start Here|fa-rocket
//! reference
//! api||fa-code
//! ```
//!
//! Blank lines and `#` comments are ignored. Empty fields mean "no override".
//! When a folder name is listed twice the first line wins. Folders that are
//! not listed sort after the listed ones.
//!
//! Besides reading, this module maintains manifests on disk:
//! [`generate_manifests`] writes a starter manifest for every directory that
//! has subfolders but no manifest, and [`sync_icons`] copies each subfolder's
//! landing-page `icon` header into the manifest's third field.

use crate::header::Header;
use crate::naming::{humanize, is_reserved_name};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write manifest {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub folder_name: String,
    pub title: Option<String>,
    pub icon: Option<String>,
}

/// Parsed manifest of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderManifest {
    entries: Vec<ManifestEntry>,
}

impl FolderManifest {
    pub fn parse(text: &str) -> Self {
        let mut seen = HashSet::new();
        let entries = text
            .lines()
            .filter_map(parse_line)
            .filter(|entry| seen.insert(entry.folder_name.to_lowercase()))
            .collect();
        Self { entries }
    }

    /// Read `dir/file_name`. A missing file is an empty manifest.
    pub fn read(dir: &Path, file_name: &str) -> Result<Self, ManifestError> {
        let path = dir.join(file_name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ManifestError::Read { path, source }),
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a folder in the manifest (case-insensitive).
    pub fn position(&self, folder_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.folder_name.eq_ignore_ascii_case(folder_name))
    }

    pub fn entry(&self, folder_name: &str) -> Option<&ManifestEntry> {
        self.position(folder_name).map(|i| &self.entries[i])
    }

    /// Sort key placing listed folders first in manifest order, then the
    /// rest by lowercase name.
    pub fn sort_key(&self, folder_name: &str) -> (usize, String) {
        (
            self.position(folder_name).unwrap_or(usize::MAX),
            folder_name.to_lowercase(),
        )
    }
}

fn non_empty(field: Option<&str>) -> Option<String> {
    field.map(str::trim).filter(|f| !f.is_empty()).map(str::to_string)
}

fn parse_line(line: &str) -> Option<ManifestEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut fields = line.splitn(3, '|');
    let folder_name = fields.next()?.trim();
    if folder_name.is_empty() {
        return None;
    }
    Some(ManifestEntry {
        folder_name: folder_name.to_string(),
        title: non_empty(fields.next()),
        icon: non_empty(fields.next()),
    })
}

// ============================================================================
// Manifest maintenance
// ============================================================================

#[derive(Debug, Clone)]
pub struct ManifestOptions {
    pub file_name: String,
    pub index_file: String,
    /// Replace manifests that already exist.
    pub overwrite: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            file_name: "folders.txt".to_string(),
            index_file: "index.md".to_string(),
            overwrite: false,
        }
    }
}

/// Outcome of a maintenance pass. Failures are advisories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestReport {
    pub directories: usize,
    pub written: Vec<PathBuf>,
    pub lines_updated: usize,
    pub warnings: Vec<String>,
}

fn visible_subdirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !is_reserved_name(name))
        .collect();
    names.sort_by_key(|n| n.to_lowercase());
    Ok(names)
}

fn visible_dirs(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_reserved_name(&e.file_name().to_string_lossy()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
}

/// Write a manifest listing every subfolder with a humanized title, in each
/// directory under `root` that has subfolders.
pub fn generate_manifests(root: &Path, options: &ManifestOptions) -> ManifestReport {
    let mut report = ManifestReport::default();

    for dir in visible_dirs(root) {
        report.directories += 1;
        let path = dir.join(&options.file_name);
        if path.exists() && !options.overwrite {
            continue;
        }
        let subdirs = match visible_subdirs(&dir) {
            Ok(s) if s.is_empty() => continue,
            Ok(s) => s,
            Err(e) => {
                report.warnings.push(format!("{}: {e}", dir.display()));
                continue;
            }
        };

        let mut text = String::from("# name|title|icon\n");
        for name in &subdirs {
            text.push_str(&format!("{name}|{}\n", humanize(name)));
        }
        match fs::write(&path, text) {
            Ok(()) => {
                debug!(path = %path.display(), "wrote manifest");
                report.written.push(path);
            }
            Err(source) => {
                let err = ManifestError::Write { path, source };
                warn!("{err}");
                report.warnings.push(err.to_string());
            }
        }
    }
    report
}

/// Copy each listed subfolder's landing-page `icon` into the manifest.
///
/// Lines keep their name and title; the icon field is replaced when the
/// landing page declares one. Comments and unlisted lines are preserved.
pub fn sync_icons(root: &Path, options: &ManifestOptions) -> ManifestReport {
    let mut report = ManifestReport::default();

    for dir in visible_dirs(root) {
        report.directories += 1;
        let path = dir.join(&options.file_name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => {
                report
                    .warnings
                    .push(ManifestError::Read { path, source }.to_string());
                continue;
            }
        };

        let mut changed = 0;
        let lines: Vec<String> = text
            .lines()
            .map(|line| match sync_line(&dir, line, options, &mut report.warnings) {
                Some(updated) if updated != line => {
                    changed += 1;
                    updated
                }
                _ => line.to_string(),
            })
            .collect();

        if changed == 0 {
            continue;
        }
        let mut updated = lines.join("\n");
        if text.ends_with('\n') {
            updated.push('\n');
        }
        match fs::write(&path, updated) {
            Ok(()) => {
                report.lines_updated += changed;
                report.written.push(path);
            }
            Err(source) => report
                .warnings
                .push(ManifestError::Write { path, source }.to_string()),
        }
    }
    report
}

fn sync_line(
    dir: &Path,
    line: &str,
    options: &ManifestOptions,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let entry = parse_line(line)?;
    let child = dir.join(&entry.folder_name);
    if !child.is_dir() {
        warnings.push(format!(
            "{}: listed folder \"{}\" does not exist",
            dir.display(),
            entry.folder_name
        ));
        return None;
    }
    let landing = fs::read_to_string(child.join(&options.index_file)).ok()?;
    let icon = Header::parse_optional(&landing)
        .non_empty("icon")?
        .to_string();
    let title = entry.title.unwrap_or_default();
    Some(format!("{}|{title}|{icon}", entry.folder_name))
}
