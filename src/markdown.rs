//! Boundary to the Markdown engine (`pulldown-cmark`).
//!
//! The rest of the crate never touches the parser directly. A document body
//! is parsed once into a [`MarkdownDoc`], an owned event stream, and every
//! consumer (validation, search projection, HTML rendering) reads from it.
//!
//! Headings get stable anchor ids at parse time: an explicit `{#id}`
//! attribute wins, otherwise the id is a slug of the heading text, made
//! unique within the document by `-1`, `-2`, … suffixes.

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use std::collections::HashSet;

/// Engine options used for every document.
pub fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_DEFINITION_LIST
        | Options::ENABLE_GFM
}

/// A heading as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingInfo {
    pub level: u8,
    /// Anchor id, `None` only when the document was parsed without id
    /// assignment and the heading had no explicit attribute.
    pub id: Option<String>,
    pub text: String,
}

/// Top-level reading order of headings and paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(HeadingInfo),
    Paragraph(String),
}

/// A parsed document body.
#[derive(Debug, Clone)]
pub struct MarkdownDoc {
    events: Vec<Event<'static>>,
}

impl MarkdownDoc {
    /// Parse `text` and assign an anchor id to every heading.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::parse_without_ids(text);
        assign_heading_ids(&mut doc.events);
        doc
    }

    /// Parse `text`, keeping only ids declared with `{#id}`.
    pub fn parse_without_ids(text: &str) -> Self {
        let events = Parser::new_ext(text, options())
            .map(Event::into_static)
            .collect();
        Self { events }
    }

    pub fn events(&self) -> &[Event<'static>] {
        &self.events
    }

    pub fn headings(&self) -> Vec<HeadingInfo> {
        self.blocks()
            .into_iter()
            .filter_map(|b| match b {
                Block::Heading(h) => Some(h),
                Block::Paragraph(_) => None,
            })
            .collect()
    }

    pub fn heading_levels(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Start(Tag::Heading { level, .. }) => Some(level_number(*level)),
                _ => None,
            })
            .collect()
    }

    /// Headings and paragraphs in document order, with their inline text.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut current: Option<(Option<HeadingInfo>, String)> = None;

        for event in &self.events {
            match event {
                Event::Start(Tag::Heading { level, id, .. }) => {
                    let info = HeadingInfo {
                        level: level_number(*level),
                        id: id.as_ref().map(|s| s.to_string()),
                        text: String::new(),
                    };
                    current = Some((Some(info), String::new()));
                }
                Event::Start(Tag::Paragraph) => current = Some((None, String::new())),
                Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Paragraph) => {
                    if let Some((heading, text)) = current.take() {
                        let text = collapse_whitespace(&text);
                        blocks.push(match heading {
                            Some(mut info) => {
                                info.text = text;
                                Block::Heading(info)
                            }
                            None => Block::Paragraph(text),
                        });
                    }
                }
                Event::Text(t) | Event::Code(t) | Event::InlineMath(t) => {
                    if let Some((_, text)) = current.as_mut() {
                        text.push_str(t);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some((_, text)) = current.as_mut() {
                        text.push(' ');
                    }
                }
                _ => {}
            }
        }
        blocks
    }

    /// Plain-text projection: inline text only, one line per block.
    pub fn plain_text(&self) -> String {
        let mut raw = String::new();
        for event in &self.events {
            match event {
                Event::Text(t) | Event::Code(t) | Event::InlineMath(t) | Event::DisplayMath(t) => {
                    raw.push_str(t)
                }
                Event::SoftBreak => raw.push(' '),
                Event::HardBreak => raw.push('\n'),
                Event::End(TagEnd::TableCell) => raw.push(' '),
                Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::CodeBlock
                    | TagEnd::TableRow
                    | TagEnd::TableHead
                    | TagEnd::DefinitionListTitle
                    | TagEnd::DefinitionListDefinition,
                ) => raw.push('\n'),
                _ => {}
            }
        }

        let mut out = String::with_capacity(raw.len());
        let mut blank_run = false;
        for line in raw.lines().map(str::trim_end) {
            if line.trim().is_empty() {
                blank_run = true;
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
                if blank_run {
                    out.push('\n');
                }
            }
            blank_run = false;
            out.push_str(line);
        }
        out
    }

    /// Remove the first heading when it is an H1 whose text equals `title`
    /// (case-insensitive). The page shell renders the title itself.
    pub fn strip_leading_title(&mut self, title: &str) -> bool {
        let Some(start) = self
            .events
            .iter()
            .position(|e| matches!(e, Event::Start(Tag::Heading { .. })))
        else {
            return false;
        };
        if !matches!(
            &self.events[start],
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            })
        ) {
            return false;
        }
        let Some(len) = self.events[start..]
            .iter()
            .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
        else {
            return false;
        };
        let text = inline_text(&self.events[start + 1..start + len]);
        if !text.trim().eq_ignore_ascii_case(title.trim()) {
            return false;
        }
        self.events.drain(start..=start + len);
        true
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        html::push_html(&mut out, self.events.iter().cloned());
        out
    }
}

/// Anchor slug: lowercase, non-word characters dropped, whitespace runs
/// collapsed to a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' || c == '-' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() {
            pending_dash = true;
        }
    }
    slug
}

/// Make `base` unique among `used` by appending `-1`, `-2`, …
pub fn unique_slug(base: &str, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "section" } else { base };
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| used.insert(candidate.clone()))
        .unwrap_or_default()
}

fn assign_heading_ids(events: &mut [Event<'static>]) {
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    for i in 0..events.len() {
        if !matches!(&events[i], Event::Start(Tag::Heading { id: None, .. })) {
            continue;
        }
        let end = events[i..]
            .iter()
            .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
            .map(|n| i + n)
            .unwrap_or(events.len());
        let slug = unique_slug(&slugify(&inline_text(&events[i + 1..end])), &mut used);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slug));
        }
    }
}

fn inline_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) | Event::InlineMath(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
