//! Verse cleaning and validation.

use std::fmt;

use crate::config::{ExtractConfig, SiteConfig};

/// Collapse whitespace runs to single spaces and trim. Literal `&nbsp;`
/// left over from double-escaped markup counts as whitespace.
pub fn clean_text(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writing system a verse must contain at least one character of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Devanagari,
    Arabic,
    Latin,
    /// No script requirement.
    Any,
}

impl Script {
    /// Script the site serves for a `lang` value.
    pub fn for_locale(locale: &str) -> Self {
        match locale.to_ascii_lowercase().as_str() {
            "hi" => Script::Devanagari,
            "ur" => Script::Arabic,
            "en" => Script::Latin,
            _ => Script::Any,
        }
    }

    pub fn contains(&self, c: char) -> bool {
        match self {
            Script::Devanagari => ('\u{0900}'..='\u{097F}').contains(&c),
            Script::Arabic => matches!(
                c,
                '\u{0600}'..='\u{06FF}'
                    | '\u{0750}'..='\u{077F}'
                    | '\u{FB50}'..='\u{FDFF}'
                    | '\u{FE70}'..='\u{FEFF}'
            ),
            Script::Latin => c.is_ascii_alphabetic() || ('\u{00C0}'..='\u{024F}').contains(&c),
            Script::Any => true,
        }
    }

    /// True if any character of `text` belongs to this script.
    pub fn matches(&self, text: &str) -> bool {
        text.chars().any(|c| self.contains(c))
    }
}

/// Why a candidate block was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    WrongScript,
    TooShort,
    Branding,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::WrongScript => "no characters in the target script",
            Rejection::TooShort => "too short",
            Rejection::Branding => "contains the site brand",
        };
        f.write_str(reason)
    }
}

/// Accepts cleaned verse lines.
#[derive(Debug, Clone)]
pub struct VerseValidator {
    script: Script,
    min_len: usize,
    /// Lowercased; empty disables the check.
    brand_token: String,
}

impl VerseValidator {
    pub fn new(script: Script, min_len: usize, brand_token: &str) -> Self {
        Self {
            script,
            min_len,
            brand_token: brand_token.to_lowercase(),
        }
    }

    pub fn from_config(site: &SiteConfig, extract: &ExtractConfig) -> Self {
        Self::new(
            Script::for_locale(&site.locale),
            extract.min_verse_len,
            &site.brand_token,
        )
    }

    /// Check a cleaned line. Length is counted in characters.
    pub fn check(&self, line: &str) -> Result<(), Rejection> {
        if !self.script.matches(line) {
            return Err(Rejection::WrongScript);
        }
        if line.chars().count() <= self.min_len {
            return Err(Rejection::TooShort);
        }
        if !self.brand_token.is_empty() && line.to_lowercase().contains(&self.brand_token) {
            return Err(Rejection::Branding);
        }
        Ok(())
    }

    pub fn accepts(&self, line: &str) -> bool {
        self.check(line).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> VerseValidator {
        VerseValidator::new(Script::Devanagari, 5, "rekhta")
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  ab   cd\n\t ef  "), "ab cd ef");
        assert_eq!(clean_text("ab&nbsp;cd"), "ab cd");
        assert_eq!(clean_text("ab &nbsp; cd"), "ab cd");
        assert_eq!(clean_text("ab\u{00A0}cd"), "ab cd");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_accepts_devanagari_verse() {
        assert!(validator().accepts("उम्र गुज़रेगी इम्तिहान में क्या"));
    }

    #[test]
    fn test_rejects_other_script() {
        assert_eq!(
            validator().check("Share this ghazal with friends"),
            Err(Rejection::WrongScript)
        );
        assert_eq!(
            validator().check("عمر گزرے گی امتحان میں کیا"),
            Err(Rejection::WrongScript)
        );
    }

    #[test]
    fn test_length_is_strict_and_counts_chars() {
        // Five Devanagari code points, fifteen bytes.
        assert_eq!(validator().check("कककशा"), Err(Rejection::TooShort));
        assert!(validator().accepts("कककशाक"));
    }

    #[test]
    fn test_brand_token_any_case() {
        for line in [
            "रेख़्ता पर पढ़ें rekhta",
            "रेख़्ता पर पढ़ें Rekhta.org",
            "रेख़्ता पर पढ़ें REKHTA",
        ] {
            assert_eq!(validator().check(line), Err(Rejection::Branding), "{}", line);
        }
    }

    #[test]
    fn test_mixed_script_line_is_kept() {
        assert!(validator().accepts("ग़ज़ल (ghazal) by Jaun"));
    }

    #[test]
    fn test_script_for_locale() {
        assert_eq!(Script::for_locale("hi"), Script::Devanagari);
        assert_eq!(Script::for_locale("UR"), Script::Arabic);
        assert_eq!(Script::for_locale("en"), Script::Latin);
        assert_eq!(Script::for_locale("xx"), Script::Any);
        assert!(Script::Arabic.matches("عمر"));
        assert!(Script::Latin.matches("Jaun"));
    }

    #[test]
    fn test_empty_brand_token_disables_check() {
        let v = VerseValidator::new(Script::Latin, 5, "");
        assert!(v.accepts("Read more on rekhta"));
    }
}
