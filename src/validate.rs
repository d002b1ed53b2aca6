//! Content checks run over every parsed document before it is emitted.
//!
//! Neither check is fatal: results are collected as advisories in the build
//! report.
//!
//! - **Heading order**: the first heading must be an H1, and each later
//!   heading may go at most one level deeper than the one before it.
//!   Going back up any number of levels is fine.
//! - **Image references**: every local image a page references must exist.
//!   References come from Markdown image syntax, raw `<img src>` in inline
//!   or block HTML, and `srcset` candidates on `<img>` and `<source>`.

use crate::include::normalize_path;
use crate::markdown::MarkdownDoc;
use pulldown_cmark::{Event, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc\s*=\s*(?:"([^"]+)"|'([^']+)'|([^\s>]+))"#)
        .expect("img src pattern is valid")
});

static SRCSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<(?:img|source)\b[^>]*\bsrcset\s*=\s*(?:"([^"]+)"|'([^']+)'|([^\s>]+))"#)
        .expect("srcset pattern is valid")
});

const EXTERNAL_SCHEMES: [&str; 5] = ["http:", "https:", "data:", "mailto:", "tel:"];

// ============================================================================
// Heading order
// ============================================================================

/// Whether a sequence of heading levels breaks the outline rules.
///
/// A document without headings passes.
pub fn heading_order_violation(levels: impl IntoIterator<Item = u8>) -> bool {
    let mut previous: Option<u8> = None;
    for level in levels {
        match previous {
            None if level != 1 => return true,
            Some(prev) if level > prev + 1 => return true,
            _ => {}
        }
        previous = Some(level);
    }
    false
}

// ============================================================================
// Image references
// ============================================================================

/// Where in the source an image reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageOrigin {
    Markdown,
    HtmlSrc,
    HtmlSrcset,
}

impl std::fmt::Display for ImageOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::HtmlSrc => "img src",
            Self::HtmlSrcset => "srcset",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub url: String,
    pub origin: ImageOrigin,
}

/// An image reference whose target does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingImage {
    pub document: PathBuf,
    pub url: String,
    pub origin: ImageOrigin,
    pub resolved: PathBuf,
}

/// Maps a local image URL to a filesystem location and checks it exists.
pub trait UrlResolver: Sync {
    fn resolve(&self, document: &Path, url: &str) -> PathBuf;

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Default resolver: a leading `/` is relative to the site root, anything
/// else to the referencing document's directory.
#[derive(Debug, Clone)]
pub struct SiteRootResolver {
    site_root: PathBuf,
}

impl SiteRootResolver {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
        }
    }
}

impl UrlResolver for SiteRootResolver {
    fn resolve(&self, document: &Path, url: &str) -> PathBuf {
        match url.strip_prefix('/') {
            Some(rooted) => normalize_path(&self.site_root.join(rooted)),
            None => {
                let dir = document.parent().unwrap_or_else(|| Path::new(""));
                normalize_path(&dir.join(url))
            }
        }
    }
}

/// Every raw image reference in the document, in source order.
pub fn collect_image_refs(doc: &MarkdownDoc) -> Vec<ImageRef> {
    let mut refs = Vec::new();
    let mut html_block = String::new();
    let mut in_html_block = false;

    for event in doc.events() {
        match event {
            Event::Start(Tag::Image { dest_url, .. }) => refs.push(ImageRef {
                url: dest_url.to_string(),
                origin: ImageOrigin::Markdown,
            }),
            Event::Start(Tag::HtmlBlock) => {
                in_html_block = true;
                html_block.clear();
            }
            Event::End(TagEnd::HtmlBlock) => {
                in_html_block = false;
                refs.extend(html_image_refs(&html_block));
            }
            Event::Html(html) if in_html_block => html_block.push_str(html),
            Event::Html(html) | Event::InlineHtml(html) => refs.extend(html_image_refs(html)),
            _ => {}
        }
    }
    refs
}

/// Image references inside a fragment of raw HTML.
pub fn html_image_refs(html: &str) -> Vec<ImageRef> {
    let mut refs: Vec<ImageRef> = IMG_SRC
        .captures_iter(html)
        .filter_map(|caps| first_group(&caps))
        .map(|url| ImageRef {
            url,
            origin: ImageOrigin::HtmlSrc,
        })
        .collect();

    for caps in SRCSET.captures_iter(html) {
        let Some(srcset) = first_group(&caps) else {
            continue;
        };
        refs.extend(srcset.split(',').filter_map(|candidate| {
            candidate.split_whitespace().next().map(|url| ImageRef {
                url: url.to_string(),
                origin: ImageOrigin::HtmlSrcset,
            })
        }));
    }
    refs
}

fn first_group(caps: &regex::Captures<'_>) -> Option<String> {
    (1..caps.len())
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str().to_string())
}

/// Reduce a raw reference to a local path, or `None` when it is not a local
/// file reference (external scheme, anchor, template placeholder).
pub fn normalize_local_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url.contains("{{") || url.contains("}}") {
        return None;
    }
    if url.starts_with('#') || url.starts_with("//") {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    if EXTERNAL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let path = url.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(path)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| path.to_string());
    Some(decoded)
}

/// Local image references of `doc` whose targets do not exist.
pub fn check_images(
    document: &Path,
    doc: &MarkdownDoc,
    resolver: &dyn UrlResolver,
) -> Vec<MissingImage> {
    collect_image_refs(doc)
        .into_iter()
        .filter_map(|image| {
            let local = normalize_local_url(&image.url)?;
            let resolved = resolver.resolve(document, &local);
            (!resolver.exists(&resolved)).then(|| MissingImage {
                document: document.to_path_buf(),
                url: image.url,
                origin: image.origin,
                resolved,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Heading order
    // =========================================================================

    #[test]
    fn sequential_levels_ok() {
        assert!(!heading_order_violation([1, 2, 3]));
    }

    #[test]
    fn skipped_level_is_violation() {
        assert!(heading_order_violation([1, 3]));
    }

    #[test]
    fn first_heading_must_be_h1() {
        assert!(heading_order_violation([2, 3]));
    }

    #[test]
    fn going_back_up_is_fine() {
        assert!(!heading_order_violation([1, 2, 3, 1, 2]));
        assert!(!heading_order_violation([1, 2, 3, 2, 3]));
    }

    #[test]
    fn no_headings_ok() {
        assert!(!heading_order_violation(Vec::<u8>::new()));
    }

    #[test]
    fn checks_parsed_document() {
        let doc = MarkdownDoc::parse("# A\n\n#### B\n");
        assert!(heading_order_violation(doc.heading_levels()));
    }

    // =========================================================================
    // Reference collection
    // =========================================================================

    #[test]
    fn collects_markdown_images() {
        let doc = MarkdownDoc::parse("![alt](img/a.png) and ![b](/assets/b.png)\n");
        let urls: Vec<_> = collect_image_refs(&doc).into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["img/a.png", "/assets/b.png"]);
    }

    #[test]
    fn collects_inline_html_img() {
        let doc = MarkdownDoc::parse("Text <img src=\"a.png\" alt=\"x\"> more\n");
        let refs = collect_image_refs(&doc);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "a.png");
        assert_eq!(refs[0].origin, ImageOrigin::HtmlSrc);
    }

    #[test]
    fn collects_block_html_with_srcset() {
        let doc = MarkdownDoc::parse(
            "<picture>\n<source srcset=\"a-1x.png 1x, a-2x.png 2x\">\n<img src='a.png'>\n</picture>\n",
        );
        let urls: HashSet<_> = collect_image_refs(&doc).into_iter().map(|r| r.url).collect();
        assert!(urls.contains("a.png"));
        assert!(urls.contains("a-1x.png"));
        assert!(urls.contains("a-2x.png"));
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn unquoted_src_attribute() {
        let refs = html_image_refs("<IMG SRC=pic.png>");
        assert_eq!(refs[0].url, "pic.png");
    }

    #[test]
    fn srcset_does_not_count_as_src() {
        let refs = html_image_refs(r#"<img srcset="a.png 1x">"#);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].origin, ImageOrigin::HtmlSrcset);
    }

    // =========================================================================
    // URL normalization
    // =========================================================================

    #[test]
    fn external_urls_skipped() {
        for url in [
            "http://x/a.png",
            "HTTPS://x/a.png",
            "data:image/png;base64,AAAA",
            "mailto:a@b.c",
            "tel:123",
            "//cdn.example.com/a.png",
        ] {
            assert_eq!(normalize_local_url(url), None, "{url}");
        }
    }

    #[test]
    fn placeholders_and_anchors_skipped() {
        assert_eq!(normalize_local_url("{{ image }}"), None);
        assert_eq!(normalize_local_url("#top"), None);
        assert_eq!(normalize_local_url("   "), None);
    }

    #[test]
    fn query_and_fragment_stripped() {
        assert_eq!(normalize_local_url("a.png?v=2#x").as_deref(), Some("a.png"));
    }

    #[test]
    fn percent_decoded() {
        assert_eq!(
            normalize_local_url("my%20image.png").as_deref(),
            Some("my image.png")
        );
    }

    // =========================================================================
    // check_images
    // =========================================================================

    #[test]
    fn site_root_resolver_paths() {
        let resolver = SiteRootResolver::new("/site");
        let doc = Path::new("/site/docs/guide/page.md");
        assert_eq!(
            resolver.resolve(doc, "/img/a.png"),
            PathBuf::from("/site/img/a.png")
        );
        assert_eq!(
            resolver.resolve(doc, "../img/a.png"),
            PathBuf::from("/site/docs/img/a.png")
        );
    }

    #[test]
    fn reports_missing_images_only() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs/img")).unwrap();
        fs::write(tmp.path().join("docs/img/present.png"), b"png").unwrap();
        let page = tmp.path().join("docs/page.md");

        let doc = MarkdownDoc::parse(
            "![a](img/present.png) ![b](img/missing.png) ![c](https://x/y.png)\n",
        );
        let missing = check_images(&page, &doc, &SiteRootResolver::new(tmp.path()));
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].url, "img/missing.png");
        assert_eq!(missing[0].resolved, tmp.path().join("docs/img/missing.png"));
    }

    struct EverythingExists;

    impl UrlResolver for EverythingExists {
        fn resolve(&self, _document: &Path, url: &str) -> PathBuf {
            PathBuf::from(url)
        }

        fn exists(&self, _path: &Path) -> bool {
            true
        }
    }

    #[test]
    fn resolver_is_injectable() {
        let doc = MarkdownDoc::parse("![a](nowhere.png)\n");
        assert!(check_images(Path::new("p.md"), &doc, &EverythingExists).is_empty());
    }
}
