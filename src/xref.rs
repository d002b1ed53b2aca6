//! Cross-reference resolution.
//!
//! Authors link to other documents by identifier instead of by path:
//!
//! | Source text     | Rewritten                         |
//! |-----------------|-----------------------------------|
//! | `see @setup`    | `see [Setup](/docs/guide/setup.html)` |
//! | `[here](@setup)`| `[here](/docs/guide/setup.html)`  |
//!
//! A `@` only starts a reference when the character before it is not a word
//! character, so e-mail addresses are left alone. Identifiers are matched
//! case-insensitively and longest first, and a match must end at an
//! identifier boundary: with ids `a` and `a-b`, `@a-b` always resolves to
//! `a-b` and `@a-bc` resolves to neither.
//!
//! Tokens that match no identifier are left verbatim and reported by
//! [`find_rogue_references`].

use crate::registry::Registry;
use crate::template::escape;
use crate::types::Link;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ROGUE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w])@([A-Za-z][A-Za-z0-9_-]*)").expect("rogue token pattern is valid")
});

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Immutable identifier → [`Link`] index built from a frozen registry.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    links: Vec<Link>,
    /// Candidate links per lowercase first character, longest id first.
    candidates: HashMap<char, Vec<usize>>,
}

impl LinkIndex {
    /// Index every document of the registry.
    ///
    /// The registry has already rejected duplicate identifiers, so this
    /// cannot fail.
    pub fn build(registry: &Registry) -> Self {
        let links: Vec<Link> = registry.documents().iter().map(|d| d.link()).collect();

        let mut candidates: HashMap<char, Vec<usize>> = HashMap::new();
        for (i, link) in links.iter().enumerate() {
            let key = link.id.to_lowercase();
            if let Some(first) = key.chars().next() {
                candidates.entry(first).or_default().push(i);
            }
        }
        for bucket in candidates.values_mut() {
            bucket.sort_by(|&a, &b| {
                links[b]
                    .id
                    .len()
                    .cmp(&links[a].id.len())
                    .then_with(|| links[a].id.cmp(&links[b].id))
            });
        }

        Self { links, candidates }
    }

    /// Every link, in registry order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Replace every resolvable `@id` / `(@id)` in `text`.
    pub fn rewrite(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for (at, _) in text.match_indices('@') {
            if at < last {
                continue;
            }
            if text[..at].chars().next_back().is_some_and(is_word_char) {
                continue;
            }
            let rest = &text[at + 1..];
            let Some((link, matched_len)) = self.longest_match(rest) else {
                continue;
            };
            let end = at + 1 + matched_len;
            let parenthesized =
                text[..at].ends_with('(') && text[end..].starts_with(')');

            out.push_str(&text[last..at]);
            if parenthesized {
                out.push_str(&link.href);
            } else {
                out.push_str(&markdown_link(link));
            }
            last = end;
        }

        out.push_str(&text[last..]);
        out
    }

    fn longest_match(&self, rest: &str) -> Option<(&Link, usize)> {
        let first = rest.chars().next()?.to_lowercase().next()?;
        let bucket = self.candidates.get(&first)?;
        bucket.iter().find_map(|&i| {
            let link = &self.links[i];
            let len = link.id.len();
            let slice = rest.get(..len)?;
            if slice.to_lowercase() != link.id.to_lowercase() {
                return None;
            }
            if rest[len..].chars().next().is_some_and(is_identifier_char) {
                return None;
            }
            Some((link, len))
        })
    }
}

/// `[title](href)`, with an icon element in front of the label when the
/// target declares one.
///
/// A `@` in the title is written as `&#64;` so the label can never be read
/// back as a reference: rewriting stays idempotent and the rogue scan stays
/// quiet. Markdown renders the entity as a plain `@`.
fn markdown_link(link: &Link) -> String {
    let label = link.title.replace('@', "&#64;");
    match &link.icon {
        Some(icon) => format!(
            "[<i class=\"{}\"></i> {label}]({})",
            escape(icon),
            link.href
        ),
        None => format!("[{label}]({})", link.href),
    }
}

/// Every `@identifier` token still present in `text`, in order of
/// appearance and without duplicates.
pub fn find_rogue_references(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in ROGUE_TOKEN.captures_iter(text) {
        let Some(id) = caps.get(1) else { continue };
        let token = format!("@{}", id.as_str());
        if !seen.contains(&token) {
            seen.push(token);
        }
    }
    seen
}
