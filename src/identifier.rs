//! Author identifier normalization.
//!
//! Turns a free-form poet name ("  Jaun   Eliya ") into the path segment the
//! catalog uses ("jaun-eliya").

use std::fmt;

/// Canonical author identifier: lowercase, trimmed, whitespace runs replaced
/// by a single hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorIdentifier(String);

impl AuthorIdentifier {
    /// Normalize raw user input.
    pub fn normalize(raw: &str) -> Self {
        Self(normalize_slug(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AuthorIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AuthorIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase and hyphenate a poet name.
pub fn normalize_slug(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_slug("Jaun Eliya"), "jaun-eliya");
        assert_eq!(normalize_slug("Mirza Ghalib"), "mirza-ghalib");
    }

    #[test]
    fn test_normalize_collapses_whitespace_runs() {
        assert_eq!(normalize_slug("  Faiz \t Ahmad\n Faiz  "), "faiz-ahmad-faiz");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_slug(""), "");
        assert_eq!(normalize_slug("   \t "), "");
        assert!(AuthorIdentifier::normalize("  ").is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["Jaun Eliya", "  A  B\tC ", "already-slugged", "ÄHMAD Faraz", ""] {
            let once = normalize_slug(raw);
            assert_eq!(normalize_slug(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn test_normalize_has_no_whitespace_and_is_lowercase() {
        for raw in ["Ahmad  Faraz", " Parveen\u{a0}Shakir ", "MIR Taqi Mir"] {
            let slug = normalize_slug(raw);
            assert!(!slug.chars().any(char::is_whitespace), "{:?}", slug);
            assert_eq!(slug, slug.to_lowercase());
        }
    }

    #[test]
    fn test_display() {
        let id = AuthorIdentifier::normalize("Jaun Eliya");
        assert_eq!(id.to_string(), "jaun-eliya");
        assert_eq!(id.as_str(), "jaun-eliya");
    }
}
