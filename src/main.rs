use clap::{Parser, Subcommand};
use hivedoc::build::{self, BuildOptions};
use hivedoc::config::{SiteConfig, SitePaths};
use hivedoc::manifest::{self, ManifestOptions};
use hivedoc::{config, output, registry};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "hivedoc")]
#[command(about = "Static documentation builder for multi-hive Markdown sites")]
#[command(long_about = "\
Static documentation builder for multi-hive Markdown sites

Each hive is a folder of Markdown documents with its own base URL. Every
document declares a title and a corpus-unique uid in its header; other
documents link to it with @uid.

Project structure:

  project/
  ├── hivedoc.toml                 # Site config (optional)
  ├── source/
  │   ├── index.md                 # Home hive (top level only)
  │   ├── .flubs/<uid>.json        # Optional property table per document
  │   ├── .meta/<uid>.json         # Optional node metadata per document
  │   └── docs/                    # Hive \"Docs\" → /docs
  │       ├── index.md             # Landing page
  │       ├── folders.txt          # Optional folder order: name|title|icon
  │       ├── _partials/           # Leading _ or . = never published
  │       └── guide/
  │           ├── index.md
  │           └── setup.md         # ---\\n title: Setup\\n uid: setup\\n ---
  └── staging/                     # Rendered output, hive folders rebuilt each run

Document header fields:
  title    Display title (required)
  uid      Identifier for @uid references (required)
  order    Position among siblings (lower first)
  section  Start a navigation section (true/yes/1)
  show     \"no\" hides the page from navigation
  icon     Navigation icon

Run 'hivedoc gen-config' to generate a documented hivedoc.toml.")]
#[command(version)]
struct Cli {
    /// Config file; its directory is the project base
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write pages and artifacts
    Build,
    /// Collect and validate every document without writing
    Check,
    /// Print the navigation tree of one hive as JSON
    Toc {
        /// Hive name or short name
        hive: String,
        /// Show an indented outline instead of JSON
        #[arg(long)]
        tree: bool,
    },
    /// Generate folder manifests for every hive
    Manifests {
        /// Replace manifests that already exist
        #[arg(long)]
        overwrite: bool,
        /// Copy icons from landing pages into existing manifests instead
        #[arg(long)]
        sync_icons: bool,
    },
    /// Add a title header to every document that lacks one
    Titles,
    /// Print a stock hivedoc.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Build => {
            let (site, paths) = load(&cli.config)?;
            let hives = site.build_hives(&paths);
            println!("==> Stage 1: Collecting {}", paths.source_root.display());
            output::print_hives(&hives, &paths.source_root);

            println!("==> Stage 2: Rendering → {}", paths.staging_root.display());
            let report = build::build_site(&site, &paths, &BuildOptions { write: true })?;
            output::print_build_report(&report, &paths.source_root, "Built");

            println!("==> Build complete: {}", paths.staging_root.display());
        }
        Command::Check => {
            let (site, paths) = load(&cli.config)?;
            println!("==> Checking {}", paths.source_root.display());
            let report = build::build_site(&site, &paths, &BuildOptions { write: false })?;
            output::print_build_report(&report, &paths.source_root, "Checked");
            if report.failure_count() > 0 {
                return Err(format!("{} documents failed", report.failure_count()).into());
            }
            println!("==> Content is valid");
        }
        Command::Toc { hive, tree } => {
            let (site, paths) = load(&cli.config)?;
            let nodes = build::navigation_for(&site, &paths, &hive)?;
            if tree {
                output::print_toc_tree(&nodes);
            } else {
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            }
        }
        Command::Manifests {
            overwrite,
            sync_icons,
        } => {
            let (site, paths) = load(&cli.config)?;
            let options = ManifestOptions {
                file_name: site.toc.manifest_file.clone(),
                index_file: site.toc.index_file.clone(),
                overwrite,
            };
            for hive in site.build_hives(&paths).iter().filter(|h| !h.is_home) {
                let report = if sync_icons {
                    manifest::sync_icons(&hive.source, &options)
                } else {
                    manifest::generate_manifests(&hive.source, &options)
                };
                output::print_manifest_report(&hive.name, &report, &paths.source_root);
            }
        }
        Command::Titles => {
            let (site, paths) = load(&cli.config)?;
            for hive in site.build_hives(&paths) {
                let changed = registry::ensure_titles(&hive)?;
                println!("{}: added {} titles", hive.name, changed);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the global subscriber. WARN by default.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, _) => Level::DEBUG,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load(path: &Path) -> Result<(SiteConfig, SitePaths), config::ConfigError> {
    let site = config::load_config(path)?;
    let paths = site.paths(config_base(path));
    Ok((site, paths))
}

/// Directory holding the config file; other paths resolve against it.
fn config_base(config: &Path) -> &Path {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
