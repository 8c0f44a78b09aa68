//! Item link filtering, normalization and deduplication.

use std::collections::BTreeSet;

use scraper::{Html, Selector};
use url::Url;

use crate::config::{DiscoveryConfig, SiteConfig};
use crate::models::ItemUrl;

/// Query parameter carrying the locale.
const LOCALE_PARAM: &str = "lang";

#[derive(Debug, thiserror::Error)]
pub enum LinkFilterError {
    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("invalid anchor selector: {0}")]
    Selector(String),
}

/// Decides which anchors on the catalog page are content items.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    base: Url,
    marker: String,
    locale: String,
    excluded_classes: Vec<String>,
    min_len: usize,
    anchors: Selector,
}

impl LinkFilter {
    /// Build a filter for one site layout.
    pub fn new(site: &SiteConfig, discovery: &DiscoveryConfig) -> Result<Self, LinkFilterError> {
        let anchors =
            Selector::parse("a[href]").map_err(|e| LinkFilterError::Selector(e.to_string()))?;
        Ok(Self {
            base: Url::parse(&site.base_url)?,
            marker: site.item_marker(),
            locale: site.locale.clone(),
            excluded_classes: discovery.excluded_classes.clone(),
            min_len: discovery.min_link_len,
            anchors,
        })
    }

    /// Normalize one anchor. Returns `None` when the anchor is not a
    /// content item.
    pub fn normalize<'a, I>(&self, href: &str, classes: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let href = href.trim();
        if !href.contains(&self.marker) {
            return None;
        }
        if classes
            .into_iter()
            .any(|class| self.excluded_classes.iter().any(|ex| ex == class))
        {
            return None;
        }

        let mut url = self.base.join(href).ok()?;
        url.set_fragment(None);
        ensure_locale(&mut url, &self.locale);

        let link = String::from(url);
        (link.chars().count() > self.min_len).then_some(link)
    }

    /// Every content link in `markup`, in document order (may repeat).
    pub fn extract(&self, markup: &str) -> Vec<String> {
        let document = Html::parse_document(markup);
        document
            .select(&self.anchors)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                self.normalize(href, a.value().classes())
            })
            .collect()
    }
}

/// Append the locale parameter unless the link already carries it.
/// A different `lang` value is replaced.
fn ensure_locale(url: &mut Url, locale: &str) {
    if url
        .query_pairs()
        .any(|(k, v)| k == LOCALE_PARAM && v == locale)
    {
        return;
    }

    let others: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != LOCALE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &others {
        pairs.append_pair(k, v);
    }
    pairs.append_pair(LOCALE_PARAM, locale);
}

/// Append-only set of discovered item links.
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    links: BTreeSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a normalized link. Returns true if it was new.
    pub fn insert(&mut self, link: String) -> bool {
        self.links.insert(link)
    }

    /// Add every link, returning how many were new.
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, links: I) -> usize {
        links.into_iter().filter(|l| self.insert(l.clone())).count()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Freeze into a lexicographically sorted sequence.
    pub fn into_sorted(self) -> Vec<ItemUrl> {
        self.links.into_iter().map(ItemUrl::new_unchecked).collect()
    }
}
