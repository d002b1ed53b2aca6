//! Centralized naming rules: display titles, reserved names, and URL synthesis.
//!
//! Every component that turns a filesystem name into something a reader sees
//! goes through here, so the registry, the TOC builder and the cross-reference
//! index agree on titles and URLs for the same file.
//!
//! ## Display Titles
//!
//! Filesystem tokens are kebab or snake case. When no explicit title is
//! declared they are humanized to title case:
//! - `getting-started` → "Getting Started"
//! - `command_line_interface` → "Command Line Interface"
//!
//! ## URLs
//!
//! - `guide/index.md` → `{base}/guide/` (landing page maps to its directory)
//! - `guide/setup.md` → `{base}/guide/setup.html`

use heck::ToTitleCase;
use std::path::{Component, Path};

/// Leading characters that mark a file or directory as hidden/internal.
pub const RESERVED_PREFIXES: [char; 2] = ['.', '_'];

/// Whether a file or directory name is hidden/internal and skipped entirely.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIXES)
}

/// Convert a kebab/snake-case filesystem token to a title-case display string.
pub fn humanize(token: &str) -> String {
    token.to_title_case()
}

/// Title as shown in a page shell: kept verbatim when it already starts with
/// an uppercase letter, humanized otherwise.
pub fn display_title(title: &str) -> String {
    match title.chars().next() {
        Some(c) if c.is_uppercase() => title.to_string(),
        Some(_) => humanize(title),
        None => String::new(),
    }
}

/// Normalize a base URL to a leading `/` and no trailing `/`.
///
/// - `"docs"` → `"/docs"`
/// - `"/docs/"` → `"/docs"`
/// - `"/"` → `""` (site root)
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Join path components with `/` regardless of platform separator.
pub fn url_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Site URL for a document at `relative` (relative to its hive root).
///
/// The landing document (`index_file`) maps to its directory with a trailing
/// `/`; any other document has its source extension replaced by `extension`.
pub fn page_url(base: &str, relative: &Path, index_file: &str, extension: &str) -> String {
    let is_landing = relative
        .file_name()
        .map(|n| n.to_string_lossy().eq_ignore_ascii_case(index_file))
        .unwrap_or(false);

    if is_landing {
        let dir = relative.parent().map(url_path).unwrap_or_default();
        if dir.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{dir}/")
        }
    } else {
        let stem = url_path(&relative.with_extension(""));
        format!("{base}/{stem}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn humanize_kebab_case() {
        assert_eq!(humanize("getting-started"), "Getting Started");
    }

    #[test]
    fn humanize_snake_case() {
        assert_eq!(humanize("command_line_interface"), "Command Line Interface");
    }

    #[test]
    fn display_title_keeps_capitalized() {
        assert_eq!(display_title("API reference"), "API reference");
    }

    #[test]
    fn display_title_humanizes_lowercase() {
        assert_eq!(display_title("erosion-basics"), "Erosion Basics");
    }

    #[test]
    fn display_title_empty() {
        assert_eq!(display_title(""), "");
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved_name(".data"));
        assert!(is_reserved_name("_drafts"));
        assert!(!is_reserved_name("guide"));
    }

    #[test]
    fn base_url_gets_leading_slash() {
        assert_eq!(normalize_base_url("docs"), "/docs");
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        assert_eq!(normalize_base_url("/docs/"), "/docs");
    }

    #[test]
    fn root_base_url_is_empty() {
        assert_eq!(normalize_base_url("/"), "");
        assert_eq!(normalize_base_url(""), "");
    }

    #[test]
    fn landing_page_url_is_directory() {
        let rel = PathBuf::from("guide/index.md");
        assert_eq!(page_url("/docs", &rel, "index.md", "html"), "/docs/guide/");
    }

    #[test]
    fn root_landing_page_url() {
        let rel = PathBuf::from("index.md");
        assert_eq!(page_url("/docs", &rel, "index.md", "html"), "/docs/");
        assert_eq!(page_url("", &rel, "index.md", "html"), "/");
    }

    #[test]
    fn page_url_replaces_extension() {
        let rel = PathBuf::from("guide/setup.md");
        assert_eq!(
            page_url("/docs", &rel, "index.md", "html"),
            "/docs/guide/setup.html"
        );
    }

    #[test]
    fn landing_match_is_case_insensitive() {
        let rel = PathBuf::from("guide/INDEX.md");
        assert_eq!(page_url("/docs", &rel, "index.md", "html"), "/docs/guide/");
    }
}
