//! Page shell and placeholder substitution.
//!
//! A shell is any HTML text containing `%%TOKEN%%` placeholders. Rendering
//! is a single left-to-right pass: each placeholder is replaced by its value
//! and substituted values are never rescanned, so page content containing a
//! literal `%%TITLE%%` stays intact. Unknown placeholders are left as-is.
//!
//! | Token          | Value                                              |
//! |----------------|----------------------------------------------------|
//! | `CONTENT`      | rendered page body (raw HTML)                      |
//! | `TITLE`        | display title                                      |
//! | `HIVE`         | hive name                                          |
//! | `HIVEPATH`     | hive base URL                                      |
//! | `SHORTNAME`    | hive short name                                    |
//! | `HREF`         | page URL                                           |
//! | `SLUG`         | document identifier                                |
//! | `NODEDATA`     | node metadata block (raw HTML), `<hr>` without one |
//! | `NODEFAMILY`   | node family, empty without metadata                |
//! | `NODECATEGORY` | node toolbox, empty without metadata               |
//! | `V`            | build date, `MM.DD.YYYY`                           |
//!
//! Without a configured template file the built-in shell is used, rendered
//! once with maud.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%([A-Z_]+)%%").expect("placeholder pattern is valid"));

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PageShell {
    source: String,
}

impl PageShell {
    /// Load the shell from `path`, or the built-in shell when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, TemplateError> {
        match path {
            Some(path) => fs::read_to_string(path)
                .map(Self::from_source)
                .map_err(|source| TemplateError::Read {
                    path: path.to_path_buf(),
                    source,
                }),
            None => Ok(Self::builtin()),
        }
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn builtin() -> Self {
        Self::from_source(builtin_shell().into_string())
    }

    /// Substitute every known placeholder in one pass.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                let key = &caps[1];
                values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// HTML-escape a plain-text value before substitution.
pub fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

fn builtin_shell() -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "%%TITLE%% · %%HIVE%%" }
                link rel="stylesheet" href="/assets/css/site.css";
                script src="/assets/js/TOC_%%SHORTNAME%%.js" {}
                script src="/assets/js/site.js" defer {}
            }
            body data-hive="%%SHORTNAME%%" data-slug="%%SLUG%%" data-href="%%HREF%%"
                data-family="%%NODEFAMILY%%" data-category="%%NODECATEGORY%%" {
                header.site-header {
                    a.hive-home href="%%HIVEPATH%%/" { "%%HIVE%%" }
                }
                nav id="site-toc" {}
                main.content {
                    h1.page-title { "%%TITLE%%" }
                    (PreEscaped("%%NODEDATA%%"))
                    (PreEscaped("%%CONTENT%%"))
                }
                footer.site-footer {
                    "Updated %%V%%"
                }
            }
        }
    }
}
