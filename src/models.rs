//! Data types shared by the harvest phases.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifier::AuthorIdentifier;

/// Absolute URL of one content page, always carrying the locale parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemUrl(String);

impl ItemUrl {
    /// Wrap an already-normalized URL. Normalization lives in
    /// `discovery::links`; this constructor does not validate.
    pub(crate) fn new_unchecked(url: String) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, used for short log lines.
    pub fn slug(&self) -> &str {
        let path = self.0.split(['?', '#']).next().unwrap_or(&self.0);
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(path)
    }
}

impl fmt::Display for ItemUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One output row: author, cleaned verse body, and the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub author: String,
    /// Verses joined with `\n`.
    pub body: String,
    pub source: String,
}

impl VerseRecord {
    pub fn new(author: &AuthorIdentifier, body: String, source: &ItemUrl) -> Self {
        Self {
            author: author.as_str().to_string(),
            body,
            source: source.as_str().to_string(),
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Links produced by discovery.
    pub total_links: usize,
    /// Records written to the dataset.
    pub successes: usize,
    /// Pages fetched fine but with no valid verse.
    pub skipped_empty: usize,
    /// Pages that could not be fetched (non-200 after retries, network fault).
    pub skipped_unavailable: usize,
    /// True if the run stopped early on a shutdown request.
    pub interrupted: bool,
}

impl HarvestSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_empty + self.skipped_unavailable
    }

    pub fn processed(&self) -> usize {
        self.successes + self.skipped()
    }
}
