//! URL template engine.
//!
//! Patterns carry `{{name}}` placeholders. Rendering substitutes every placeholder
//! that has a value in a single left-to-right pass, so the result does not depend on
//! the order values were set in and a substituted value is never rescanned.
//! Placeholders without a value are left verbatim, which is how the `*_scheme`
//! URL generators hand out patterns for clients to fill in.
//!
//! Every substituted value is percent-encoded. Unreserved characters
//! (`A-Z a-z 0-9 - _ . ~`) pass through untouched, so slugs, lower-cased
//! filenames and extensions render as-is.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// The placeholders URL patterns may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    Bucket,
    Filename,
    Extension,
    Width,
    Height,
    Border,
    Sex,
    Ids,
    Hash,
    Token,
    Download,
}

impl Placeholder {
    pub const ALL: [Placeholder; 11] = [
        Placeholder::Bucket,
        Placeholder::Filename,
        Placeholder::Extension,
        Placeholder::Width,
        Placeholder::Height,
        Placeholder::Border,
        Placeholder::Sex,
        Placeholder::Ids,
        Placeholder::Hash,
        Placeholder::Token,
        Placeholder::Download,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Bucket => "bucket",
            Placeholder::Filename => "filename",
            Placeholder::Extension => "extension",
            Placeholder::Width => "width",
            Placeholder::Height => "height",
            Placeholder::Border => "border",
            Placeholder::Sex => "sex",
            Placeholder::Ids => "ids",
            Placeholder::Hash => "hash",
            Placeholder::Token => "token",
            Placeholder::Download => "download",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl Display for Placeholder {
    /// Renders the placeholder token, e.g. `{{bucket}}`.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{}{}", OPEN, self.name(), CLOSE)
    }
}

/// Values to substitute into a pattern.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: BTreeMap<Placeholder, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, placeholder: Placeholder, value: impl Display) -> Self {
        self.values.insert(placeholder, value.to_string());
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }

    /// Substitute these values into `pattern`.
    pub fn render(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len()..];

            let Some(end) = after.find(CLOSE) else {
                out.push_str(&rest[start..]);
                return out;
            };

            let name = &after[..end];
            if name.contains(OPEN) {
                // "{{{{bucket}}": emit the first brace pair, rescan from the next.
                out.push_str(OPEN);
                rest = after;
                continue;
            }

            match Placeholder::from_name(name).and_then(|p| self.get(p)) {
                Some(value) => out.push_str(&urlencoding::encode(value)),
                None => {
                    out.push_str(OPEN);
                    out.push_str(name);
                    out.push_str(CLOSE);
                }
            }
            rest = &after[end + CLOSE.len()..];
        }

        out.push_str(rest);
        out
    }
}
