//! Search-index projection of a parsed document.
//!
//! Pure: given a document's identity and its parsed body, produce the record
//! that goes into `search.json`. Each heading carries its anchor id and a
//! short snippet taken from the first paragraph below it.

use crate::markdown::{Block, MarkdownDoc, slugify, unique_slug};
use crate::types::{Document, HeadingRecord, SearchRecord};
use std::collections::HashSet;

/// Maximum snippet length in characters, before the ellipsis.
pub const SNIPPET_LIMIT: usize = 220;

/// Build the search record for a document.
pub fn build_record(hive: &str, title: &str, url: &str, body: &MarkdownDoc) -> SearchRecord {
    SearchRecord {
        hive: hive.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        text: body.plain_text(),
        headings: heading_records(body),
    }
}

/// [`build_record`] for a registered document.
pub fn record_for(document: &Document, body: &MarkdownDoc) -> SearchRecord {
    build_record(&document.hive, &document.title, &document.href, body)
}

fn heading_records(body: &MarkdownDoc) -> Vec<HeadingRecord> {
    let blocks = body.blocks();
    let mut used: HashSet<String> = blocks
        .iter()
        .filter_map(|b| match b {
            Block::Heading(h) => h.id.clone(),
            Block::Paragraph(_) => None,
        })
        .collect();

    let mut records = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        let Block::Heading(heading) = block else {
            continue;
        };
        let id = heading
            .id
            .clone()
            .unwrap_or_else(|| unique_slug(&slugify(&heading.text), &mut used));
        let snippet = blocks[i + 1..]
            .iter()
            .take_while(|b| !matches!(b, Block::Heading(_)))
            .find_map(|b| match b {
                Block::Paragraph(text) if !text.is_empty() => Some(truncate(text, SNIPPET_LIMIT)),
                _ => None,
            })
            .unwrap_or_default();

        records.push(HeadingRecord {
            id,
            text: heading.text.clone(),
            level: heading.level,
            snippet,
        });
    }
    records
}

/// Truncate to `limit` characters, appending `…` when anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
