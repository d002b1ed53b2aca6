//! Shared test utilities for the hivedoc test suite.
//!
//! Provides corpus builders that write Markdown files with headers into a
//! temp directory, hive constructors, and navigation tree assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_docs_corpus();
//! let hive = hive_at(tmp.path(), "/docs");
//! let nodes = build_toc(&hive.source, &hive.url, &TocOptions::default()).unwrap().nodes;
//!
//! assert_nav_shape(&nodes, &[
//!     ("Home", &[]),
//!     ("Guide", &["Overview", "Setup"]),
//! ]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::registry::{CollectOptions, Registry, collect};
use crate::types::{Hive, NavNode};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write a Markdown file with a header built from `fields`.
///
/// Parent directories are created as needed.
pub fn write_page(root: &Path, rel: &str, fields: &[(&str, &str)], body: &str) {
    let mut text = String::from("---\n");
    for (key, value) in fields {
        text.push_str(&format!("{key}: {value}\n"));
    }
    text.push_str("---\n");
    text.push_str(body);
    write_file(root, rel, &text);
}

/// Write a raw file, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A non-home hive rooted at `source`, staging into a reserved sibling
/// directory that collection never walks.
pub fn hive_at(source: &Path, url: &str) -> Hive {
    Hive {
        name: "Docs".to_string(),
        short_name: "docs".to_string(),
        source: source.to_path_buf(),
        destination: source.join("_staging"),
        url: crate::naming::normalize_base_url(url),
        is_home: false,
    }
}

/// The small corpus used across TOC, registry and xref tests:
///
/// ```text
/// index.md          Home (home)
/// guide/index.md    Guide (guide-home)
/// guide/setup.md    Setup (setup, order 1)
/// ```
pub fn setup_docs_corpus() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_page(
        tmp.path(),
        "index.md",
        &[("title", "Home"), ("uid", "home")],
        "# Home\n\nWelcome. Start with @setup.\n",
    );
    write_page(
        tmp.path(),
        "guide/index.md",
        &[("title", "Guide"), ("uid", "guide-home")],
        "# Guide\n\nAll about the guide.\n",
    );
    write_page(
        tmp.path(),
        "guide/setup.md",
        &[("title", "Setup"), ("uid", "setup"), ("order", "1")],
        "# Setup\n\nInstall it.\n",
    );
    tmp
}

/// Collect and freeze a single hive. Panics on any error.
pub fn frozen_registry(hive: &Hive) -> Registry {
    let collection = collect(hive, &CollectOptions::default()).unwrap();
    Registry::freeze(vec![collection]).unwrap()
}

// =========================================================================
// Navigation helpers
// =========================================================================

/// Top-level navigation titles in order.
pub fn nav_titles(nodes: &[NavNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.title.as_str()).collect()
}

/// Find a node by title at the top level. Panics if not found.
pub fn find_nav<'a>(nodes: &'a [NavNode], title: &str) -> &'a NavNode {
    nodes.iter().find(|n| n.title == title).unwrap_or_else(|| {
        let titles = nav_titles(nodes);
        panic!("nav item '{title}' not found. Available: {titles:?}")
    })
}

/// Assert that the navigation tree matches an expected two-level shape.
///
/// Each entry is `(title, children)`. Use `&[]` for leaf nodes.
pub fn assert_nav_shape(nodes: &[NavNode], expected: &[(&str, &[&str])]) {
    let expected_titles: Vec<&str> = expected.iter().map(|(t, _)| *t).collect();
    assert_eq!(nav_titles(nodes), expected_titles, "nav top-level titles mismatch");

    for (title, children) in expected {
        let actual = nav_titles(find_nav(nodes, title).children());
        assert_eq!(actual, children.to_vec(), "nav children of '{title}' mismatch");
    }
}
