//! Rekhta ghazal harvester.
//!
//! Two strictly sequential phases: a headless browser scrolls a poet's
//! catalog page until it stops growing and collects item links, then each
//! item page is fetched over HTTP, its verses validated, and accepted
//! records appended to a CSV dataset.

pub mod browser;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod discovery;
pub mod extract;
pub mod harvest;
pub mod http_client;
pub mod identifier;
pub mod models;
pub mod pacing;
pub mod shutdown;
#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;

pub use config::Config;
pub use dataset::{CsvDataset, DatasetError, DatasetWriter, MemoryDataset};
pub use discovery::LinkDiscoveryEngine;
pub use extract::VerseExtractor;
pub use harvest::{HarvestEvent, Harvester};
pub use identifier::AuthorIdentifier;
pub use models::{HarvestSummary, ItemUrl, VerseRecord};
