//! # hivedoc
//!
//! A static documentation builder for Markdown corpora split into *hives*:
//! independent document trees that each publish under their own base URL
//! and share one identifier namespace. Any document can link to any other
//! with a short `@uid` reference.
//!
//! # Architecture: Freeze, Then Fan Out
//!
//! ```text
//! 1. Collect   source/<hive>/**.md  →  Registry   (headers only, hives in parallel)
//! 2. Freeze    Registry             →  LinkIndex  (duplicate uid = nothing written)
//!              clear stale staged output, load sidecar JSON
//! 3. Process   each document        →  page       (bounded rayon pool)
//!              each hive            →  TOC_<short>.js
//! 4. Emit      search.json, llms-full.txt, atlinks.json, recent.json, rogue-refs.txt
//! ```
//!
//! Every identifier is known before any body is touched, so reference
//! resolution never depends on processing order. The registry and link index
//! are immutable once built and shared by reference into the parallel stage;
//! per-document outcomes flow back through the iterator into a
//! [`build::BuildReport`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`build`] | Orchestrates the pipeline and writes every artifact |
//! | [`header`] | Leading `---` key/value block: split, parse, ensure a title |
//! | [`registry`] | Walks hives into documents and freezes the uid registry |
//! | [`xref`] | `@uid` rewriting and rogue-reference detection |
//! | [`include`] | `{% include "path" %}` expansion with a bounded round count |
//! | [`markdown`] | pulldown-cmark wrapper: heading ids, plain text, HTML |
//! | [`validate`] | Heading-order and local-image checks |
//! | [`toc`] | Per-hive navigation tree and its JavaScript artifact |
//! | [`manifest`] | `folders.txt` parsing, generation and icon sync |
//! | [`search`] | Search record projection of a parsed document |
//! | [`sidecar`] | `.flubs`/`.meta` JSON: property tables and node data |
//! | [`template`] | `%%TOKEN%%` page shell, built-in shell via Maud |
//! | [`config`] | `hivedoc.toml` loading, merging and validation |
//! | [`naming`] | URL and title conventions shared by every stage |
//! | [`types`] | Shared data types (`Hive`, `Document`, `NavNode`, ...) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Headers Stay Strings
//!
//! A header is a plain string map at the boundary. Each consumer validates
//! only the fields it reads: the registry requires `title` and `uid`, the TOC
//! reads `order`, `section`, `show` and `icon`. A page with an odd `order`
//! value still builds; it just sorts last.
//!
//! ## Failures Are Per Document
//!
//! Only a duplicate identifier stops a build. A document with a missing
//! header field, a missing strict include or an unwritable output is recorded
//! in the report and the batch carries on. Heading order, rogue references
//! and missing images are advisories printed at the end.
//!
//! ## Maud For The Built-In Shell
//!
//! The default page shell is written with [Maud](https://maud.lambda.xyz/), so
//! a project needs no template file to get a working site. A configured
//! template replaces it entirely; both use the same `%%TOKEN%%` placeholders.

pub mod build;
pub mod config;
pub mod header;
pub mod include;
pub mod manifest;
pub mod markdown;
pub mod naming;
pub mod output;
pub mod registry;
pub mod search;
pub mod sidecar;
pub mod template;
pub mod toc;
pub mod types;
pub mod validate;
pub mod xref;

#[cfg(test)]
pub(crate) mod test_helpers;
