//! Document header parsing.
//!
//! Every authored document starts with a metadata block delimited by `---`
//! lines (the closing delimiter may also be `...`):
//!
//! ```text
//! ---
//! title: Getting Started
//! uid: setup
//! show: no
//! ---
//! Body text starts here.
//! ```
//!
//! Lines are `key: value` pairs. Keys are matched case-insensitively, values
//! are trimmed and surrounding quotes are stripped. Blank lines and `#`
//! comments are ignored, as are lines without a `:`. Unknown keys are kept so
//! later stages can read them.
//!
//! The header is the only thing the registry reads during collection; each
//! consumer converts just the fields it needs through [`Header::get`],
//! [`Header::require`], [`Header::flag`] and [`Header::order`].

use std::collections::BTreeMap;
use thiserror::Error;

const BOM: char = '\u{feff}';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("malformed header: {0}")]
    Malformed(&'static str),
    #[error("missing required header field `{0}`")]
    MissingField(String),
}

/// Parsed key/value metadata of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    fields: BTreeMap<String, String>,
}

impl Header {
    /// Parse the header block at the start of `text`.
    ///
    /// Returns the header and the remaining body. Fails when the text does
    /// not start with an opening `---` (leading blank lines and a BOM are
    /// allowed) or when the block is never closed.
    pub fn split(text: &str) -> Result<(Header, &str), HeaderError> {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        let mut lines = LineCursor::new(text);

        let opening = loop {
            match lines.next() {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
                None => return Err(HeaderError::Malformed("document is empty")),
            }
        };
        if opening.trim() != "---" {
            return Err(HeaderError::Malformed("missing opening `---`"));
        }

        let mut fields = BTreeMap::new();
        loop {
            let Some(line) = lines.next() else {
                return Err(HeaderError::Malformed("header block is not terminated"));
            };
            let trimmed = line.trim();
            if trimmed == "---" || trimmed == "..." {
                break;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = trimmed.split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    fields.insert(key.to_ascii_lowercase(), unquote(value.trim()).to_string());
                }
            }
        }

        Ok((Header { fields }, lines.rest()))
    }

    /// Parse leniently: any failure yields an empty header.
    pub fn parse_optional(text: &str) -> Header {
        Self::split(text).map(|(h, _)| h).unwrap_or_default()
    }

    /// Raw value for `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Value for `key`, treating an empty value as absent.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Non-empty value for `key`, or [`HeaderError::MissingField`].
    pub fn require(&self, key: &str) -> Result<&str, HeaderError> {
        self.non_empty(key)
            .ok_or_else(|| HeaderError::MissingField(key.to_ascii_lowercase()))
    }

    /// Whether `key` is set to `expected` (case-insensitive).
    pub fn is(&self, key: &str, expected: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    }

    /// Boolean flag: `true`, `yes` and `1` count as set.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| ["true", "yes", "1"].iter().any(|t| v.eq_ignore_ascii_case(t)))
            .unwrap_or(false)
    }

    /// Integer value for `key`; unparseable values count as absent.
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// The `order` ordering hint.
    pub fn order(&self) -> Option<i64> {
        self.integer("order")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse the header block of `text`, discarding the body.
pub fn parse_header(text: &str) -> Result<Header, HeaderError> {
    Header::split(text).map(|(header, _)| header)
}

/// Split `text` into its header and body.
pub fn split_header(text: &str) -> Result<(Header, &str), HeaderError> {
    Header::split(text)
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Iterates lines (without terminators) while tracking the byte offset of the
/// unread remainder.
struct LineCursor<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, offset: 0 }
    }

    fn next(&mut self) -> Option<&'a str> {
        if self.offset >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.offset..];
        let (line, consumed) = match rest.find('\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.offset += consumed;
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    fn rest(&self) -> &'a str {
        &self.text[self.offset.min(self.text.len())..]
    }
}

// ============================================================================
// Title normalization
// ============================================================================

/// Ensure `markdown` declares `title: <title>` in its header.
///
/// - No header block: one is prepended.
/// - Header without a title: the title is appended to the block.
/// - Header with a title: replaced only when `replace_existing` is set.
///
/// The BOM and the dominant newline style of the input are preserved.
/// Returns `None` when nothing changes.
pub fn ensure_title(markdown: &str, title: &str, replace_existing: bool) -> Option<String> {
    let (bom, text) = match markdown.strip_prefix(BOM) {
        Some(rest) => (BOM.to_string(), rest),
        None => (String::new(), markdown),
    };
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let title_line = format!("title: {}", quote_if_needed(title));

    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let start = lines.iter().position(|l| !l.trim().is_empty());
    let opening = start.filter(|&i| lines[i].trim() == "---");
    let closing = opening.and_then(|open| {
        lines[open + 1..]
            .iter()
            .position(|l| matches!(l.trim(), "---" | "..."))
            .map(|i| open + 1 + i)
    });

    let (Some(open), Some(close)) = (opening, closing) else {
        let body = text;
        return Some(format!("{bom}---{newline}{title_line}{newline}---{newline}{body}"));
    };

    let existing = (open + 1..close).find(|&i| is_title_line(lines[i]));
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    match existing {
        Some(_) if !replace_existing => return None,
        Some(i) if lines[i].trim() == title_line => return None,
        Some(i) => out[i] = title_line,
        None => out.insert(close, title_line),
    }
    Some(format!("{bom}{}", out.join(newline)))
}

fn is_title_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return false;
    }
    trimmed
        .split_once(':')
        .map(|(key, _)| key.trim().eq_ignore_ascii_case("title"))
        .unwrap_or(false)
}

fn quote_if_needed(title: &str) -> String {
    let needs_quotes = title.contains(':')
        || title.contains('#')
        || title.starts_with(['"', '\'', ' '])
        || title.ends_with(' ');
    if needs_quotes {
        format!("\"{}\"", title.replace('"', "\\\""))
    } else {
        title.to_string()
    }
}
