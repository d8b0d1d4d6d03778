use std::fmt;

use serde::Serialize;

/// Normalized search key used both for the database lookup and as the
/// persisted search term. Only [`SearchTerm::normalize`] constructs one, so a
/// value of this type is always escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Normalize raw user input.
    ///
    /// A value wrapped in double quotes keeps its quoting (exact-phrase search);
    /// the inner text is HTML-escaped, spaces become `%20`, and the whole key is
    /// lowercased.
    pub fn normalize(raw: &str) -> Self {
        let (inner, quoted) = if raw.starts_with('"') && raw.ends_with('"') {
            (raw.trim_matches('"'), true)
        } else {
            (raw, false)
        };

        let encoded = escape_html(inner).replace(' ', "%20");
        let key = if quoted {
            format!("\"{encoded}\"")
        } else {
            encoded
        };

        Self(key.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_exact_phrase(&self) -> bool {
        self.0.len() >= 2 && self.0.starts_with('"') && self.0.ends_with('"')
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SearchTerm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Escapes the five HTML metacharacters using numeric entities for quotes.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
