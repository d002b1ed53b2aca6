//! Shared types used across the build pipeline.
//!
//! The registry produces [`Document`]s, the resolver derives [`Link`]s, the TOC
//! builder produces [`NavNode`] trees, and the search builder produces
//! [`SearchRecord`]s. Anything that lands in an emitted artifact derives
//! `Serialize` with the field names the site scripts read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// A named root of the document tree ("hive").
///
/// Each hive has its own source directory, staging destination and base URL.
/// A home hive only contributes the documents at the top of its source
/// directory and publishes no navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hive {
    pub name: String,
    pub short_name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Base URL with a leading `/` and no trailing `/` (empty for the site root).
    pub url: String,
    pub is_home: bool,
}

/// One authored content unit, as collected by the registry.
///
/// Only the header is read during collection; the body is read again by the
/// per-document stage once the registry is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Absolute source location.
    pub path: PathBuf,
    /// Location of the staged copy under the hive destination.
    pub destination: PathBuf,
    /// Path relative to the hive source directory.
    pub relative_path: PathBuf,
    pub id: String,
    pub title: String,
    pub hidden: bool,
    pub starts_section: bool,
    pub icon: Option<String>,
    pub order: Option<i64>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Name of the owning hive.
    pub hive: String,
    /// Site-relative URL of the rendered page.
    pub href: String,
}

impl Document {
    /// The resolved link other documents use to reference this one.
    pub fn link(&self) -> Link {
        Link {
            id: self.id.clone(),
            href: self.href.clone(),
            title: self.title.clone(),
            icon: self.icon.clone(),
            hidden: self.hidden,
        }
    }
}

/// Resolved addressable target of a `@id` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id: String,
    pub href: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

/// One entry of a hive's navigation tree.
///
/// A node without `url` is a non-clickable group; a node without `children`
/// is a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavNode {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NavNode>>,
}

impl NavNode {
    pub fn leaf(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            icon: None,
            section: None,
            children: None,
        }
    }

    pub fn group(title: impl Into<String>, children: Vec<NavNode>) -> Self {
        Self {
            title: title.into(),
            url: None,
            icon: None,
            section: None,
            children: (!children.is_empty()).then_some(children),
        }
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_section(mut self, section: bool) -> Self {
        self.section = section.then_some(true);
        self
    }

    /// Children as a slice (empty for leaves).
    pub fn children(&self) -> &[NavNode] {
        self.children.as_deref().unwrap_or_default()
    }
}

/// Search index entry for one rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRecord {
    pub hive: String,
    pub title: String,
    pub url: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<HeadingRecord>,
}

/// A heading anchor inside a [`SearchRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingRecord {
    pub id: String,
    pub text: String,
    pub level: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub snippet: String,
}

/// Entry of the changelog-style `recent.json` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentChange {
    pub id: String,
    pub title: String,
    pub href: String,
    pub hive: String,
    pub modified_at: DateTime<Utc>,
}
