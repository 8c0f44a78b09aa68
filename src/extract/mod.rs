//! Verse extraction from individual item pages.
//!
//! Fetches through the retrying client, selects the verse elements inside
//! the content container, and keeps only lines that pass validation. No
//! error escapes: a page either yields a body or is reported as a skip.

mod verse;

pub use verse::{clean_text, Rejection, Script, VerseValidator};

use scraper::{Html, Selector};
use tracing::{debug, trace};

use crate::config::{Config, ConfigError};
use crate::http_client::{FetchOutcome, RetryingClient, Transport};

/// Result of extracting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Valid verses joined with `\n`.
    Body(String),
    /// Page fetched but nothing passed validation.
    Empty,
    /// Page could not be fetched.
    Unavailable(String),
    /// Shutdown requested mid-fetch.
    Cancelled,
}

impl Extraction {
    pub fn into_body(self) -> Option<String> {
        match self {
            Extraction::Body(body) => Some(body),
            _ => None,
        }
    }
}

/// Turns item URLs into verse bodies.
pub struct VerseExtractor<T> {
    client: RetryingClient<T>,
    selector: Selector,
    validator: VerseValidator,
}

impl<T: Transport> VerseExtractor<T> {
    pub fn new(
        client: RetryingClient<T>,
        selector: &str,
        validator: VerseValidator,
    ) -> Result<Self, ConfigError> {
        let selector = Selector::parse(selector).map_err(|e| {
            ConfigError::Invalid(format!("bad verse selector {:?}: {}", selector, e))
        })?;
        Ok(Self {
            client,
            selector,
            validator,
        })
    }

    pub fn from_config(client: RetryingClient<T>, config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            client,
            &config.extract.selector,
            VerseValidator::from_config(&config.site, &config.extract),
        )
    }

    pub fn client(&self) -> &RetryingClient<T> {
        &self.client
    }

    /// Body text for `url`, or `None` when nothing could be extracted.
    pub async fn extract(&self, url: &str) -> Option<String> {
        self.extract_detailed(url).await.into_body()
    }

    /// Like `extract`, keeping the reason for a skip.
    pub async fn extract_detailed(&self, url: &str) -> Extraction {
        match self.client.fetch(url).await {
            FetchOutcome::Ok(html) => match self.parse_body(&html) {
                Some(body) => Extraction::Body(body),
                None => {
                    debug!("No valid verses on {}", url);
                    Extraction::Empty
                }
            },
            FetchOutcome::Status(status) => Extraction::Unavailable(format!("HTTP {}", status)),
            FetchOutcome::Failed(e) => Extraction::Unavailable(e),
            FetchOutcome::Cancelled => Extraction::Cancelled,
        }
    }

    /// Join every valid verse of `html` in document order.
    pub fn parse_body(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let verses: Vec<String> = document
            .select(&self.selector)
            .map(|el| clean_text(&el.text().collect::<String>()))
            .filter(|line| match self.validator.check(line) {
                Ok(()) => true,
                Err(reason) => {
                    trace!("Dropping {:?}: {}", line, reason);
                    false
                }
            })
            .collect();

        if verses.is_empty() {
            None
        } else {
            Some(verses.join("\n"))
        }
    }
}
