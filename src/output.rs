//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every entity (hive,
//! navigation node, page) leads with its semantic identity: positional index
//! and title. Filesystem paths follow as indented `Source:` lines, shown
//! relative to the source root.
//!
//! # Output Format
//!
//! ## Navigation
//!
//! ```text
//! 001 Overview → /docs/
//! 002 Guide [section]
//!     001 Setup → /docs/guide/setup.html
//! ```
//!
//! ## Build
//!
//! ```text
//! Hives
//!     Docs (docs)
//!         Source: docs/
//!
//! Failed
//!     guide/broken.md
//!         missing header field "uid"
//!
//! Rogue references
//!     index.md
//!         @nonexistent-id
//!
//! Built 2 hives: 14 pages, 3 sections, 14 links
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::build::BuildReport;
use crate::manifest::ManifestReport;
use crate::types::{Hive, NavNode};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Path relative to `root` when possible, for `Source:` lines.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Pluralize a count: `1 page`, `2 pages`.
fn count(n: usize, noun: &str) -> String {
    match (n, noun.strip_suffix('y')) {
        (1, _) => format!("{n} {noun}"),
        (_, Some(stem)) => format!("{n} {stem}ies"),
        _ => format!("{n} {noun}s"),
    }
}

/// Start a report section, separated from the previous one by a blank line.
fn section(lines: &mut Vec<String>, heading: &str) {
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(heading.to_string());
}

// ============================================================================
// Navigation tree
// ============================================================================

/// A flattened node from walking the navigation tree.
struct TreeNode<'a> {
    depth: usize,
    position: usize,
    node: &'a NavNode,
}

/// Walk the navigation tree, assigning positional indices per sibling level.
fn walk_nav_tree(nodes: &[NavNode]) -> Vec<TreeNode<'_>> {
    let mut flat = Vec::new();
    walk_nav_tree_recursive(nodes, 0, &mut flat);
    flat
}

fn walk_nav_tree_recursive<'a>(nodes: &'a [NavNode], depth: usize, flat: &mut Vec<TreeNode<'a>>) {
    for (i, node) in nodes.iter().enumerate() {
        flat.push(TreeNode {
            depth,
            position: i + 1,
            node,
        });
        walk_nav_tree_recursive(node.children(), depth + 1, flat);
    }
}

/// Format a navigation tree, one line per node.
pub fn format_toc_tree(nodes: &[NavNode]) -> Vec<String> {
    if nodes.is_empty() {
        return vec!["(no navigation)".to_string()];
    }
    walk_nav_tree(nodes)
        .into_iter()
        .map(|t| {
            let mut line = format!(
                "{}{} {}",
                indent(t.depth),
                format_index(t.position),
                t.node.title
            );
            if let Some(url) = &t.node.url {
                line.push_str(&format!(" → {url}"));
            }
            if t.node.section == Some(true) {
                line.push_str(" [section]");
            }
            line
        })
        .collect()
}

pub fn print_toc_tree(nodes: &[NavNode]) {
    for line in format_toc_tree(nodes) {
        println!("{}", line);
    }
}

// ============================================================================
// Build / check
// ============================================================================

/// Format the hives about to be built.
pub fn format_hives(hives: &[Hive], source_root: &Path) -> Vec<String> {
    let mut lines = vec!["Hives".to_string()];
    for hive in hives {
        let kind = if hive.is_home { ", home" } else { "" };
        lines.push(format!("{}{} ({}{})", indent(1), hive.name, hive.short_name, kind));
        let source = display_path(&hive.source, source_root);
        let source = if source.is_empty() {
            "./".to_string()
        } else {
            format!("{source}/")
        };
        lines.push(format!("{}Source: {}", indent(2), source));
    }
    lines
}

pub fn print_hives(hives: &[Hive], source_root: &Path) {
    for line in format_hives(hives, source_root) {
        println!("{}", line);
    }
}

/// Format a build report: failures, advisories, then a summary line.
///
/// `verb` is `"Built"` or `"Checked"`.
pub fn format_build_report(report: &BuildReport, source_root: &Path, verb: &str) -> Vec<String> {
    let mut lines = Vec::new();

    if report.failure_count() > 0 {
        section(&mut lines, "Failed");
        for rejected in &report.rejected {
            lines.push(format!("{}{}", indent(1), display_path(&rejected.path, source_root)));
            lines.push(format!("{}{}", indent(2), rejected.reason));
        }
        for failure in &report.failed {
            lines.push(format!("{}{}", indent(1), display_path(&failure.path, source_root)));
            lines.push(format!("{}{}", indent(2), failure.message));
        }
    }

    if !report.rogue_references.is_empty() {
        section(&mut lines, "Rogue references");
        for rogue in &report.rogue_references {
            lines.push(format!("{}{}", indent(1), display_path(&rogue.path, source_root)));
            for token in &rogue.tokens {
                lines.push(format!("{}{}", indent(2), token));
            }
        }
    }

    if !report.missing_images.is_empty() {
        section(&mut lines, "Missing images");
        for image in &report.missing_images {
            lines.push(format!("{}{}", indent(1), display_path(&image.document, source_root)));
            lines.push(format!("{}{} ({})", indent(2), image.url, image.origin));
        }
    }

    if !report.heading_violations.is_empty() {
        section(&mut lines, "Heading order");
        for path in &report.heading_violations {
            lines.push(format!("{}{}", indent(1), display_path(path, source_root)));
        }
    }

    if !report.warnings.is_empty() {
        section(&mut lines, "Warnings");
        for warning in &report.warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} {}: {}, {}, {}",
        verb,
        count(report.hives, "hive"),
        count(report.rendered, "page"),
        count(report.sections, "section"),
        count(report.links, "link"),
    ));
    if report.hive_documents.len() > 1 {
        for (hive, documents) in &report.hive_documents {
            lines.push(format!("{}{}: {}", indent(1), hive, count(*documents, "document")));
        }
    }
    if report.failure_count() > 0 {
        lines.push(format!("{} failed", count(report.failure_count(), "document")));
    }
    lines
}

pub fn print_build_report(report: &BuildReport, source_root: &Path, verb: &str) {
    for line in format_build_report(report, source_root, verb) {
        println!("{}", line);
    }
}

// ============================================================================
// Manifest maintenance
// ============================================================================

/// Format a manifest maintenance report for one hive.
pub fn format_manifest_report(hive: &str, report: &ManifestReport, source_root: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({} scanned)",
        hive,
        count(report.directories, "directory")
    )];
    for path in &report.written {
        lines.push(format!("{}Wrote: {}", indent(1), display_path(path, source_root)));
    }
    if report.lines_updated > 0 {
        lines.push(format!(
            "{}Updated {}",
            indent(1),
            count(report.lines_updated, "icon")
        ));
    }
    for warning in &report.warnings {
        lines.push(format!("{}Warning: {}", indent(1), warning));
    }
    lines
}

pub fn print_manifest_report(hive: &str, report: &ManifestReport, source_root: &Path) {
    for line in format_manifest_report(hive, report, source_root) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{DocumentFailure, RogueReference};
    use crate::registry::Rejected;
    use crate::validate::{ImageOrigin, MissingImage};
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn count_pluralizes() {
        assert_eq!(count(1, "page"), "1 page");
        assert_eq!(count(0, "page"), "0 pages");
        assert_eq!(count(3, "directory"), "3 directories");
    }

    #[test]
    fn display_path_relative_to_root() {
        let root = Path::new("/site/source");
        assert_eq!(display_path(Path::new("/site/source/docs/a.md"), root), "docs/a.md");
        assert_eq!(display_path(Path::new("/elsewhere/a.md"), root), "/elsewhere/a.md");
    }

    // =========================================================================
    // Navigation tests
    // =========================================================================

    #[test]
    fn toc_tree_positions_per_level() {
        let nodes = vec![
            NavNode::leaf("Overview", "/docs/"),
            NavNode::group(
                "Guide",
                vec![NavNode::leaf("Setup", "/docs/guide/setup.html")],
            )
            .with_section(true),
        ];
        assert_eq!(
            format_toc_tree(&nodes),
            vec![
                "001 Overview → /docs/",
                "002 Guide [section]",
                "    001 Setup → /docs/guide/setup.html",
            ]
        );
    }

    #[test]
    fn toc_tree_empty() {
        assert_eq!(format_toc_tree(&[]), vec!["(no navigation)"]);
    }

    // =========================================================================
    // Build report tests
    // =========================================================================

    #[test]
    fn clean_report_is_summary_only() {
        let report = BuildReport {
            hives: 1,
            rendered: 3,
            sections: 1,
            links: 3,
            ..BuildReport::default()
        };
        assert_eq!(
            format_build_report(&report, Path::new("/s"), "Built"),
            vec!["Built 1 hive: 3 pages, 1 section, 3 links"]
        );
    }

    #[test]
    fn multi_hive_report_breaks_down_documents() {
        let report = BuildReport {
            hives: 2,
            rendered: 4,
            links: 4,
            hive_documents: vec![("Home".into(), 1), ("Docs".into(), 3)],
            ..BuildReport::default()
        };
        assert_eq!(
            format_build_report(&report, Path::new("/s"), "Built"),
            vec![
                "Built 2 hives: 4 pages, 0 sections, 4 links",
                "    Home: 1 document",
                "    Docs: 3 documents",
            ]
        );
    }

    #[test]
    fn report_lists_failures_and_advisories() {
        let root = PathBuf::from("/s");
        let report = BuildReport {
            hives: 1,
            rendered: 1,
            rejected: vec![Rejected {
                path: root.join("docs/bad.md"),
                reason: "missing header field \"uid\"".into(),
            }],
            failed: vec![DocumentFailure {
                path: root.join("docs/inc.md"),
                message: "include not found".into(),
            }],
            rogue_references: vec![RogueReference {
                path: root.join("docs/index.md"),
                tokens: vec!["@ghost".into()],
            }],
            missing_images: vec![MissingImage {
                document: root.join("docs/index.md"),
                url: "img/a.png".into(),
                origin: ImageOrigin::Markdown,
                resolved: root.join("docs/img/a.png"),
            }],
            ..BuildReport::default()
        };
        let lines = format_build_report(&report, &root, "Checked");
        assert_eq!(lines[0], "Failed");
        assert_eq!(lines[1], "    docs/bad.md");
        assert_eq!(lines[2], "        missing header field \"uid\"");
        assert_eq!(lines[3], "    docs/inc.md");
        assert!(lines.contains(&"Rogue references".to_string()));
        assert!(lines.contains(&"        @ghost".to_string()));
        assert!(lines.contains(&"Missing images".to_string()));
        assert_eq!(lines.last().unwrap(), "2 documents failed");
        assert!(lines[lines.len() - 2].starts_with("Checked 1 hive: 1 page"));
    }

    #[test]
    fn hives_listing() {
        let hives = vec![Hive {
            name: "Docs".into(),
            short_name: "docs".into(),
            source: PathBuf::from("/s/docs"),
            destination: PathBuf::from("/t/docs"),
            url: "/docs".into(),
            is_home: false,
        }];
        assert_eq!(
            format_hives(&hives, Path::new("/s")),
            vec!["Hives", "    Docs (docs)", "        Source: docs/"]
        );
    }

    // =========================================================================
    // Manifest report tests
    // =========================================================================

    #[test]
    fn manifest_report_lines() {
        let report = ManifestReport {
            directories: 2,
            written: vec![PathBuf::from("/s/docs/guide/folders.txt")],
            lines_updated: 1,
            warnings: vec!["no index".into()],
        };
        assert_eq!(
            format_manifest_report("Docs", &report, Path::new("/s")),
            vec![
                "Docs (2 directories scanned)",
                "    Wrote: docs/guide/folders.txt",
                "    Updated 1 icon",
                "    Warning: no index",
            ]
        );
    }
}
