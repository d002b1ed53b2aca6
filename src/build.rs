//! Build orchestration.
//!
//! Runs the whole pipeline over every configured hive in two phases:
//!
//! 1. **Collect and freeze**: each hive is walked (hives in parallel) and the
//!    collections are merged into one [`Registry`]. A duplicate identifier
//!    stops the build here, before any file is written. The frozen registry
//!    yields the [`LinkIndex`]; sidecar JSON is loaded next to it and output
//!    left by earlier builds is cleared.
//! 2. **Process**: on a bounded rayon pool, every document is read, has its
//!    includes expanded, its `@id` references rewritten, and is parsed,
//!    validated, projected into a search record and rendered into the page
//!    shell. Navigation trees are built concurrently with the documents.
//!
//! Per-document outcomes come back from the parallel iterator and are folded
//! into a [`BuildReport`]; nothing in phase 2 shares mutable state. A failing
//! document is recorded and the rest of the batch carries on.
//!
//! ## Output Structure
//!
//! ```text
//! staging/
//! ├── search.json             # Compact array of search records
//! ├── llms-full.txt           # Plain text of every page
//! ├── atlinks.json            # Every resolvable @id
//! ├── recent.json             # Most recently modified pages
//! ├── rogue-refs.txt          # Pages with unresolved @id tokens
//! ├── assets/js/
//! │   └── TOC_<short>.js      # One navigation script per hive
//! └── <hive folder>/
//!     └── guide/setup.html    # One page per document
//! ```

use crate::config::{SidecarConfig, SiteConfig, SitePaths, effective_workers};
use crate::header::{HeaderError, split_header};
use crate::include::{IncludeError, IncludeExpander};
use crate::markdown::MarkdownDoc;
use crate::naming::display_title;
use crate::registry::{self, CollectOptions, Registry, RegistryError, Rejected};
use crate::search;
use crate::sidecar::{Sidecars, flub_table, node_data_source};
use crate::template::{PageShell, TemplateError, escape};
use crate::toc::{self, TocError, TocOptions};
use crate::types::{Document, Hive, NavNode, SearchRecord};
use crate::validate::{
    MissingImage, SiteRootResolver, UrlResolver, check_images, heading_order_violation,
};
use crate::xref::{LinkIndex, find_rogue_references};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Number of entries in `recent.json`.
pub const RECENT_LIMIT: usize = 50;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Toc(#[from] TocError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("unknown hive \"{0}\"")]
    UnknownHive(String),
}

/// Failure of a single document. Recorded in the report, never fatal.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Include(#[from] IncludeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Write pages and artifacts. When unset the build only validates.
    pub write: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { write: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RogueReference {
    pub path: PathBuf,
    pub tokens: Vec<String>,
}

/// Everything a build did and noticed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub hives: usize,
    pub documents: usize,
    pub rendered: usize,
    pub sections: usize,
    pub links: usize,
    /// Accepted documents per hive, in configuration order.
    pub hive_documents: Vec<(String, usize)>,
    pub rejected: Vec<Rejected>,
    pub failed: Vec<DocumentFailure>,
    pub rogue_references: Vec<RogueReference>,
    pub missing_images: Vec<MissingImage>,
    pub heading_violations: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub artifacts: Vec<PathBuf>,
}

impl BuildReport {
    /// Documents that were dropped or failed to render.
    pub fn failure_count(&self) -> usize {
        self.rejected.len() + self.failed.len()
    }

    pub fn advisory_count(&self) -> usize {
        self.rogue_references.len()
            + self.missing_images.len()
            + self.heading_violations.len()
            + self.warnings.len()
    }
}

/// Read-only state shared by every document worker.
struct Context<'a> {
    hives: HashMap<&'a str, &'a Hive>,
    links: &'a LinkIndex,
    includes: IncludeExpander,
    resolver: &'a dyn UrlResolver,
    shell: &'a PageShell,
    sidecars: &'a Sidecars,
    sidecar_config: &'a SidecarConfig,
    source_root: &'a Path,
    page_extension: &'a str,
    version: String,
    write: bool,
}

/// Result of processing one document.
struct Processed {
    title: String,
    href: String,
    record: SearchRecord,
    rogue: Vec<String>,
    missing_images: Vec<MissingImage>,
    heading_violation: bool,
}

/// Shell values taken from a document's sidecars.
struct NodeFields {
    table: Option<String>,
    data: String,
    family: String,
    category: String,
}

struct HiveToc {
    short_name: String,
    script: String,
    sections: usize,
    warnings: Vec<String>,
}

fn collect_options(config: &SiteConfig) -> CollectOptions {
    CollectOptions {
        index_file: config.toc.index_file.clone(),
        page_extension: config.page_extension.clone(),
    }
}

fn toc_options(config: &SiteConfig) -> TocOptions {
    TocOptions {
        manifest_file: config.toc.manifest_file.clone(),
        index_file: config.toc.index_file.clone(),
        page_extension: config.page_extension.clone(),
        overview_title: config.toc.overview_title.clone(),
    }
}

/// Collect every hive and freeze the registry.
pub fn collect_registry(hives: &[Hive], config: &SiteConfig) -> Result<Registry, BuildError> {
    let options = collect_options(config);
    let collections = hives
        .par_iter()
        .map(|hive| registry::collect(hive, &options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Registry::freeze(collections)?)
}

/// Run the full pipeline.
pub fn build_site(
    config: &SiteConfig,
    paths: &SitePaths,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let hives = config.build_hives(paths);
    let workers = effective_workers(&config.processing);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    info!(hives = hives.len(), workers, "starting build");

    pool.install(|| run(config, paths, &hives, options))
}

fn run(
    config: &SiteConfig,
    paths: &SitePaths,
    hives: &[Hive],
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    let registry = collect_registry(hives, config)?;
    let links = LinkIndex::build(&registry);
    info!(
        documents = registry.len(),
        rejected = registry.rejected().len(),
        "registry frozen"
    );

    let mut warnings = Vec::new();
    if options.write {
        warnings.extend(clean_staging(hives, &registry, &config.page_extension)?);
    }

    let sidecars = Sidecars::load(&paths.source_root, &config.sidecars);
    warnings.extend(sidecars.warnings.iter().cloned());
    for orphan in sidecars.orphans(&registry) {
        warn!(id = %orphan, "sidecar names no document");
        warnings.push(format!("sidecar \"{orphan}\" names no document"));
    }

    let shell = PageShell::load(paths.template.as_deref())?;
    let resolver = SiteRootResolver::new(&paths.source_root);
    let ctx = Context {
        hives: hives.iter().map(|h| (h.name.as_str(), h)).collect(),
        links: &links,
        includes: IncludeExpander::new(
            &paths.source_root,
            config.includes.max_depth,
            config.includes.mode(),
        ),
        resolver: &resolver,
        shell: &shell,
        sidecars: &sidecars,
        sidecar_config: &config.sidecars,
        source_root: &paths.source_root,
        page_extension: &config.page_extension,
        version: Utc::now().format("%m.%d.%Y").to_string(),
        write: options.write,
    };
    let toc_opts = toc_options(config);

    let (tocs, outcomes) = rayon::join(
        || {
            hives
                .par_iter()
                .map(|hive| hive_toc(hive, &toc_opts, &config.toc_variable))
                .collect::<Result<Vec<_>, _>>()
        },
        || {
            registry
                .documents()
                .par_iter()
                .map(|doc| (doc, process_document(&ctx, doc)))
                .collect::<Vec<_>>()
        },
    );
    let tocs = tocs?;

    let mut report = BuildReport {
        hives: hives.len(),
        documents: registry.len(),
        links: links.len(),
        hive_documents: hives
            .iter()
            .map(|h| (h.name.clone(), registry.in_hive(&h.name).count()))
            .collect(),
        rejected: registry.rejected().to_vec(),
        warnings,
        ..BuildReport::default()
    };
    let mut processed = Vec::with_capacity(outcomes.len());
    for (doc, outcome) in outcomes {
        match outcome {
            Ok(p) => {
                if !p.rogue.is_empty() {
                    report.rogue_references.push(RogueReference {
                        path: doc.path.clone(),
                        tokens: p.rogue.clone(),
                    });
                }
                if p.heading_violation {
                    report.heading_violations.push(doc.path.clone());
                }
                report.missing_images.extend(p.missing_images.iter().cloned());
                processed.push(p);
            }
            Err(e) => {
                warn!(path = %doc.path.display(), error = %e, "document failed");
                report.failed.push(DocumentFailure {
                    path: doc.path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    report.rendered = processed.len();
    for toc in &tocs {
        report.sections += toc.sections;
        report.warnings.extend(toc.warnings.iter().cloned());
    }

    if options.write {
        report.artifacts = write_artifacts(
            &paths.staging_root,
            &registry,
            &links,
            &processed,
            &report,
            &tocs,
        )?;
    }
    info!(
        rendered = report.rendered,
        failed = report.failure_count(),
        advisories = report.advisory_count(),
        "build finished"
    );
    Ok(report)
}

/// Remove output left by earlier builds, after the registry froze and before
/// anything is written. A non-home hive owns its whole destination directory.
/// The home hive shares the staging root with every other hive, so only its
/// top-level pages that no registered document produces are removed.
fn clean_staging(
    hives: &[Hive],
    registry: &Registry,
    page_extension: &str,
) -> Result<Vec<String>, BuildError> {
    let mut warnings = Vec::new();
    for hive in hives {
        if !hive.destination.is_dir() {
            continue;
        }
        if hive.source.starts_with(&hive.destination) {
            let message = format!(
                "{}: staging directory contains the sources, not cleaned",
                hive.destination.display()
            );
            warn!("{message}");
            warnings.push(message);
            continue;
        }

        if !hive.is_home {
            debug!(hive = %hive.name, path = %hive.destination.display(), "removing staged hive");
            fs::remove_dir_all(&hive.destination)?;
            continue;
        }

        for entry in fs::read_dir(&hive.destination)? {
            let path = entry?.path();
            let is_page = path.is_file()
                && path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(page_extension));
            if is_page && registry.by_destination(&path.with_extension("md")).is_none() {
                debug!(path = %path.display(), "removing stale page");
                fs::remove_file(&path)?;
            }
        }
    }
    Ok(warnings)
}

fn hive_toc(hive: &Hive, options: &TocOptions, variable: &str) -> Result<HiveToc, TocError> {
    if hive.is_home {
        return Ok(HiveToc {
            short_name: hive.short_name.clone(),
            script: toc::null_javascript(variable),
            sections: 0,
            warnings: Vec::new(),
        });
    }
    let built = toc::build_toc(&hive.source, &hive.url, options)?;
    debug!(hive = %hive.name, nodes = built.nodes.len(), "built navigation");
    Ok(HiveToc {
        short_name: hive.short_name.clone(),
        script: toc::to_javascript(&built.nodes, variable)?,
        sections: built.sections,
        warnings: built.warnings,
    })
}

/// Navigation tree of one hive, looked up by name or short name.
pub fn navigation_for(
    config: &SiteConfig,
    paths: &SitePaths,
    hive: &str,
) -> Result<Vec<NavNode>, BuildError> {
    let hives = config.build_hives(paths);
    let hive = hives
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(hive) || h.short_name.eq_ignore_ascii_case(hive))
        .ok_or_else(|| BuildError::UnknownHive(hive.to_string()))?;
    if hive.is_home {
        return Ok(Vec::new());
    }
    Ok(toc::build_toc(&hive.source, &hive.url, &toc_options(config))?.nodes)
}

fn process_document(ctx: &Context<'_>, doc: &Document) -> Result<Processed, DocumentError> {
    debug!(id = %doc.id, path = %doc.path.display(), "processing");
    let raw = fs::read_to_string(&doc.path).map_err(|source| DocumentError::Read {
        path: doc.path.clone(),
        source,
    })?;
    let (_, body) = split_header(&raw)?;

    let base_dir = doc.path.parent().unwrap_or_else(|| Path::new(""));
    let expanded = ctx.includes.expand(body, base_dir)?;
    let resolved = ctx.links.rewrite(&expanded);
    let rogue = find_rogue_references(&resolved);

    let mut markdown = MarkdownDoc::parse(&resolved);
    let heading_violation = heading_order_violation(markdown.heading_levels());
    let missing_images = check_images(&doc.path, &markdown, ctx.resolver);
    let record = search::record_for(doc, &markdown);
    let node = node_fields(ctx, doc)?;

    if ctx.write {
        markdown.strip_leading_title(&doc.title);
        let html = render_page(ctx, doc, &markdown, &node);
        let output = doc.destination.with_extension(ctx.page_extension);
        write_file(&output, &html).map_err(|source| DocumentError::Write {
            path: output.clone(),
            source,
        })?;
    }

    Ok(Processed {
        title: doc.title.clone(),
        href: doc.href.clone(),
        record,
        rogue,
        missing_images,
        heading_violation,
    })
}

fn node_fields(ctx: &Context<'_>, doc: &Document) -> Result<NodeFields, DocumentError> {
    let table = ctx
        .sidecars
        .flubs(&doc.id)
        .map(|flubs| flub_table(&doc.title, flubs));
    let Some(meta) = ctx.sidecars.metadata(&doc.id) else {
        return Ok(NodeFields {
            table,
            data: "<hr>".to_string(),
            family: String::new(),
            category: String::new(),
        });
    };

    let source = node_data_source(meta, ctx.sidecar_config);
    let expanded = ctx.includes.expand(&source, ctx.source_root)?;
    Ok(NodeFields {
        table,
        data: MarkdownDoc::parse_without_ids(&expanded).to_html(),
        family: escape(&meta.family),
        category: escape(&meta.toolbox),
    })
}

fn render_page(
    ctx: &Context<'_>,
    doc: &Document,
    markdown: &MarkdownDoc,
    node: &NodeFields,
) -> String {
    let (hive_name, hive_path, short_name) = ctx
        .hives
        .get(doc.hive.as_str())
        .map(|h| (h.name.as_str(), h.url.as_str(), h.short_name.as_str()))
        .unwrap_or((doc.hive.as_str(), "", ""));

    let mut content = markdown.to_html();
    if let Some(table) = &node.table {
        content.push('\n');
        content.push_str(table);
    }
    let title = escape(&display_title(&doc.title));
    let hive = escape(hive_name);
    let slug = escape(&doc.id);
    ctx.shell.render(&[
        ("CONTENT", &content),
        ("TITLE", &title),
        ("HIVE", &hive),
        ("HIVEPATH", hive_path),
        ("SHORTNAME", short_name),
        ("HREF", &doc.href),
        ("SLUG", &slug),
        ("NODEDATA", &node.data),
        ("NODEFAMILY", &node.family),
        ("NODECATEGORY", &node.category),
        ("V", &ctx.version),
    ])
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

fn write_artifacts(
    staging: &Path,
    registry: &Registry,
    links: &LinkIndex,
    processed: &[Processed],
    report: &BuildReport,
    tocs: &[HiveToc],
) -> Result<Vec<PathBuf>, BuildError> {
    let mut written = Vec::new();
    let mut emit = |name: &str, content: String| -> Result<(), BuildError> {
        let path = staging.join(name);
        write_file(&path, &content)?;
        debug!(path = %path.display(), "wrote artifact");
        written.push(path);
        Ok(())
    };

    let records: Vec<&SearchRecord> = processed.iter().map(|p| &p.record).collect();
    emit("search.json", serde_json::to_string(&records)?)?;
    emit("llms-full.txt", llms_text(processed))?;
    emit("atlinks.json", serde_json::to_string_pretty(links.links())?)?;
    emit(
        "recent.json",
        serde_json::to_string_pretty(&registry.recent_changes(RECENT_LIMIT))?,
    )?;
    emit("rogue-refs.txt", rogue_text(&report.rogue_references))?;
    for toc in tocs {
        emit(
            &format!("assets/js/TOC_{}.js", toc.short_name),
            toc.script.clone(),
        )?;
    }
    Ok(written)
}

fn llms_text(processed: &[Processed]) -> String {
    let mut out = String::new();
    for p in processed {
        out.push_str(&format!("# {}\nURL: {}\n\n{}\n\n", p.title, p.href, p.record.text));
    }
    out
}

fn rogue_text(rogue: &[RogueReference]) -> String {
    rogue
        .iter()
        .map(|r| format!("{}: {}\n", r.path.display(), r.tokens.join(", ")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HiveConfig, ProcessingConfig};
    use crate::test_helpers::{write_file as write_fixture, write_page};
    use tempfile::TempDir;

    /// Project with a single `/docs` hive under `source/docs`.
    fn project() -> (TempDir, SiteConfig, SitePaths) {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig {
            processing: ProcessingConfig {
                max_workers: Some(2),
            },
            hives: vec![HiveConfig::default()],
            ..SiteConfig::default()
        };
        let paths = config.paths(tmp.path());
        (tmp, config, paths)
    }

    fn docs(paths: &SitePaths) -> PathBuf {
        paths.source_root.join("docs")
    }

    #[test]
    fn renders_pages_and_resolves_references() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "index.md", &[("title", "Home"), ("uid", "home")], "# Home\n\nSee @setup.\n");
        write_page(&docs(&paths), "guide/setup.md", &[("title", "Setup"), ("uid", "setup")], "# Setup\n\nBody.\n");

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert_eq!(report.rendered, 2);
        assert!(report.failed.is_empty());

        let home = fs::read_to_string(paths.staging_root.join("docs/index.html")).unwrap();
        assert!(home.contains(r#"<a href="/docs/guide/setup.html">Setup</a>"#));
        assert!(paths.staging_root.join("docs/guide/setup.html").exists());
    }

    #[test]
    fn leading_title_heading_not_duplicated() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "a.md", &[("title", "Alpha"), ("uid", "a")], "# Alpha\n\nText\n");
        build_site(&config, &paths, &BuildOptions::default()).unwrap();
        let html = fs::read_to_string(paths.staging_root.join("docs/a.html")).unwrap();
        assert_eq!(html.matches("Alpha</h1>").count(), 1);
    }

    #[test]
    fn duplicate_ids_abort_before_writing() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "same")], "");
        write_page(&docs(&paths), "b.md", &[("title", "B"), ("uid", "SAME")], "");

        let result = build_site(&config, &paths, &BuildOptions::default());
        assert!(matches!(
            result,
            Err(BuildError::Registry(RegistryError::DuplicateIdentifier { .. }))
        ));
        assert!(!paths.staging_root.exists());
    }

    #[test]
    fn advisories_collected() {
        let (_tmp, config, paths) = project();
        write_page(
            &docs(&paths),
            "a.md",
            &[("title", "A"), ("uid", "a")],
            "## Starts low\n\n@ghost here ![x](missing.png)\n",
        );

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert_eq!(report.heading_violations.len(), 1);
        assert_eq!(report.rogue_references[0].tokens, vec!["@ghost"]);
        assert_eq!(report.missing_images.len(), 1);

        let rogue = fs::read_to_string(paths.staging_root.join("rogue-refs.txt")).unwrap();
        assert!(rogue.contains("@ghost"));
    }

    #[test]
    fn rejected_documents_reported_not_rendered() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "ok.md", &[("title", "Ok"), ("uid", "ok")], "");
        write_page(&docs(&paths), "bad.md", &[("title", "Bad")], "");

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.failure_count(), 1);
        assert!(!paths.staging_root.join("docs/bad.html").exists());
    }

    #[test]
    fn strict_missing_include_fails_only_that_document() {
        let (_tmp, mut config, paths) = project();
        config.includes.strict = true;
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "{% include \"gone.md\" %}\n");
        write_page(&docs(&paths), "b.md", &[("title", "B"), ("uid", "b")], "fine\n");

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].message.contains("gone.md"));
        assert_eq!(report.rendered, 1);
    }

    #[test]
    fn includes_resolve_references_too() {
        let (_tmp, config, paths) = project();
        write_fixture(&docs(&paths), "_partials/note.md", "Read @b first.");
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "{% include \"_partials/note.md\" %}\n");
        write_page(&docs(&paths), "b.md", &[("title", "B"), ("uid", "b")], "");

        build_site(&config, &paths, &BuildOptions::default()).unwrap();
        let html = fs::read_to_string(paths.staging_root.join("docs/a.html")).unwrap();
        assert!(html.contains(r#"<a href="/docs/b.html">B</a>"#));
    }

    #[test]
    fn artifacts_written() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "index.md", &[("title", "Home"), ("uid", "home")], "# Home\n\nHello.\n");

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        for name in ["search.json", "llms-full.txt", "atlinks.json", "recent.json", "rogue-refs.txt", "assets/js/TOC_docs.js"] {
            assert!(paths.staging_root.join(name).exists(), "missing {name}");
        }
        assert_eq!(report.artifacts.len(), 6);

        let search = fs::read_to_string(paths.staging_root.join("search.json")).unwrap();
        let records: serde_json::Value = serde_json::from_str(&search).unwrap();
        assert_eq!(records[0]["url"], "/docs/");
        assert_eq!(records[0]["hive"], "Docs");

        let toc = fs::read_to_string(paths.staging_root.join("assets/js/TOC_docs.js")).unwrap();
        assert!(toc.starts_with("window.SITE_TOC = ["));
    }

    #[test]
    fn home_hive_publishes_null_toc() {
        let (_tmp, mut config, paths) = project();
        config.hives = vec![HiveConfig {
            name: "Home".into(),
            short_name: "home".into(),
            folder: String::new(),
            url: "/".into(),
            is_home: true,
        }];
        write_page(&paths.source_root, "index.md", &[("title", "Home"), ("uid", "home")], "");
        write_page(&paths.source_root, "docs/x.md", &[("title", "X"), ("uid", "x")], "");

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert_eq!(report.documents, 1);
        let toc = fs::read_to_string(paths.staging_root.join("assets/js/TOC_home.js")).unwrap();
        assert_eq!(toc, "window.SITE_TOC = null;");
    }

    #[test]
    fn check_mode_writes_nothing() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "@nobody\n");

        let report = build_site(&config, &paths, &BuildOptions { write: false }).unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.rogue_references.len(), 1);
        assert!(report.artifacts.is_empty());
        assert!(!paths.staging_root.exists());
    }

    // =========================================================================
    // Staging cleanup
    // =========================================================================

    #[test]
    fn stale_hive_output_removed_before_writing() {
        let (_tmp, config, paths) = project();
        write_fixture(&paths.staging_root, "docs/old/retired.html", "stale");
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "");

        build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert!(!paths.staging_root.join("docs/old").exists());
        assert!(paths.staging_root.join("docs/a.html").exists());
    }

    #[test]
    fn home_hive_prunes_only_unregistered_pages() {
        let (_tmp, mut config, paths) = project();
        config.hives = vec![HiveConfig {
            name: "Home".into(),
            short_name: "home".into(),
            folder: String::new(),
            url: "/".into(),
            is_home: true,
        }];
        write_page(&paths.source_root, "index.md", &[("title", "Home"), ("uid", "home")], "");
        write_fixture(&paths.staging_root, "index.html", "old home");
        write_fixture(&paths.staging_root, "removed.html", "stale");
        write_fixture(&paths.staging_root, "site.css", "body {}");
        write_fixture(&paths.staging_root, "docs/kept.html", "other hive");

        build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert!(!paths.staging_root.join("removed.html").exists());
        assert!(paths.staging_root.join("site.css").exists());
        assert!(paths.staging_root.join("docs/kept.html").exists());
        let home = fs::read_to_string(paths.staging_root.join("index.html")).unwrap();
        assert_ne!(home, "old home");
    }

    #[test]
    fn failed_freeze_leaves_staging_alone() {
        let (_tmp, config, paths) = project();
        write_fixture(&paths.staging_root, "docs/old.html", "stale");
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "same")], "");
        write_page(&docs(&paths), "b.md", &[("title", "B"), ("uid", "same")], "");

        assert!(build_site(&config, &paths, &BuildOptions::default()).is_err());
        assert!(paths.staging_root.join("docs/old.html").exists());
    }

    #[test]
    fn check_mode_leaves_staging_alone() {
        let (_tmp, config, paths) = project();
        write_fixture(&paths.staging_root, "docs/old.html", "stale");
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "");

        build_site(&config, &paths, &BuildOptions { write: false }).unwrap();
        assert!(paths.staging_root.join("docs/old.html").exists());
    }

    // =========================================================================
    // Sidecars
    // =========================================================================

    #[test]
    fn flub_table_follows_content() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "blur.md", &[("title", "Blur"), ("uid", "Blur")], "Body text.\n");
        write_fixture(
            &paths.source_root,
            ".flubs/blur.json",
            r#"[{"Name": "radius", "Description": "How far to blur"}]"#,
        );

        build_site(&config, &paths, &BuildOptions::default()).unwrap();
        let html = fs::read_to_string(paths.staging_root.join("docs/blur.html")).unwrap();
        let body = html.find("Body text.").unwrap();
        let table = html.find(r#"<table class="properties-table">"#).unwrap();
        assert!(body < table);
        assert!(html.contains("<tr><td>Radius</td><td>How far to blur</td></tr>"));
    }

    #[test]
    fn node_metadata_fills_node_tokens() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "blur.md", &[("title", "Blur"), ("uid", "blur")], "Body.\n");
        write_fixture(
            &paths.source_root,
            ".meta/blur.json",
            r#"{"Family": "Filters", "Toolbox": "Image", "ShortCode": "BL", "CanCreatePorts": true}"#,
        );
        write_fixture(&paths.source_root, ".data/includes/add-ports.md", "Drag to **add** ports.");

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert!(report.warnings.is_empty());
        let html = fs::read_to_string(paths.staging_root.join("docs/blur.html")).unwrap();
        assert!(html.contains(r#"<div class="toolbox d-flex">Image › Filters</div>"#));
        assert!(html.contains("<strong>add</strong>"));
        assert!(html.contains(r#"data-family="Filters""#));
        assert!(html.contains(r#"data-category="Image""#));
    }

    #[test]
    fn pages_without_metadata_get_rule() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "Body.\n");

        build_site(&config, &paths, &BuildOptions::default()).unwrap();
        let html = fs::read_to_string(paths.staging_root.join("docs/a.html")).unwrap();
        assert_eq!(html.matches("<hr>").count(), 1);
        assert!(html.contains(r#"data-family="""#));
        assert!(!html.contains("properties-table"));
    }

    #[test]
    fn sidecar_problems_are_warnings() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "");
        write_fixture(&paths.source_root, ".meta/a.json", "{ broken");
        write_fixture(&paths.source_root, ".flubs/gone.json", r#"[{"Name": "x"}]"#);

        let report = build_site(&config, &paths, &BuildOptions::default()).unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("a.json")));
        assert!(report.warnings.iter().any(|w| w.contains("\"gone\"")));
    }

    #[test]
    fn documents_counted_per_hive() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "");
        write_page(&docs(&paths), "b.md", &[("title", "B"), ("uid", "b")], "");

        let report = build_site(&config, &paths, &BuildOptions { write: false }).unwrap();
        assert_eq!(report.hive_documents, vec![("Docs".to_string(), 2)]);
    }

    #[test]
    fn navigation_for_known_and_unknown_hive() {
        let (_tmp, config, paths) = project();
        write_page(&docs(&paths), "a.md", &[("title", "A"), ("uid", "a")], "");
        let nodes = navigation_for(&config, &paths, "docs").unwrap();
        assert_eq!(nodes[0].title, "A");
        assert!(matches!(
            navigation_for(&config, &paths, "nope"),
            Err(BuildError::UnknownHive(_))
        ));
    }
}
