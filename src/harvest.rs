//! Harvest orchestration: discovery, then sequential paced extraction.
//!
//! Separated from UI concerns - emits events for progress tracking.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::browser::ChromeLauncher;
use crate::config::Config;
use crate::dataset::{DatasetError, DatasetWriter};
use crate::discovery::{LinkDiscoveryEngine, StopReason, SurfaceLauncher};
use crate::extract::{Extraction, VerseExtractor};
use crate::http_client::{HttpClient, RetryPolicy, RetryingClient, Transport};
use crate::identifier::AuthorIdentifier;
use crate::models::{HarvestSummary, VerseRecord};
use crate::pacing::{Pacer, RandomWindow};
use crate::shutdown::Shutdown;

/// Events emitted during a harvest run.
#[derive(Debug, Clone)]
pub enum HarvestEvent {
    /// Catalog scroll started.
    DiscoveryStarted { author: String, catalog_url: String },
    /// Catalog scroll ended.
    DiscoveryFinished {
        links: usize,
        cycles: u32,
        reason: StopReason,
    },
    /// Fetching item `index` of `total`.
    ItemStarted {
        index: usize,
        total: usize,
        url: String,
    },
    /// Record written.
    ItemSaved { index: usize, url: String },
    /// No record for this item.
    ItemSkipped {
        index: usize,
        url: String,
        reason: String,
    },
    /// Run complete (or interrupted).
    Finished(HarvestSummary),
}

/// Runs one author's harvest end to end.
pub struct Harvester<L, T, P> {
    engine: LinkDiscoveryEngine<L>,
    extractor: VerseExtractor<T>,
    pacer: P,
    shutdown: Shutdown,
    events: Option<mpsc::Sender<HarvestEvent>>,
}

impl Harvester<ChromeLauncher, HttpClient, RandomWindow> {
    /// Production wiring: Chrome for discovery, reqwest for extraction.
    pub fn from_config(config: &Config, shutdown: Shutdown) -> anyhow::Result<Self> {
        let engine = LinkDiscoveryEngine::new(
            ChromeLauncher::new(config.browser.clone()),
            config.site.clone(),
            config.discovery.clone(),
        )?;

        let client = RetryingClient::new(
            HttpClient::from_config(config)?,
            RetryPolicy::from_config(&config.http),
        )
        .with_shutdown(shutdown.clone());
        let extractor = VerseExtractor::from_config(client, config)?;

        Ok(Self::new(engine, extractor, RandomWindow::from_config(&config.pacing))
            .with_shutdown(shutdown))
    }
}

impl<L, T, P> Harvester<L, T, P>
where
    L: SurfaceLauncher,
    T: Transport,
    P: Pacer,
{
    pub fn new(engine: LinkDiscoveryEngine<L>, extractor: VerseExtractor<T>, pacer: P) -> Self {
        Self {
            engine,
            extractor,
            pacer,
            shutdown: Shutdown::never(),
            events: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<HarvestEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn extractor(&self) -> &VerseExtractor<T> {
        &self.extractor
    }

    async fn emit(&self, event: HarvestEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Harvest every item for the author named by `raw_input`.
    ///
    /// Blank input is a no-op. The dataset is only opened once discovery
    /// has produced at least one link. Only dataset failures are errors.
    pub async fn run<W>(&self, raw_input: &str, dataset: &mut W) -> Result<HarvestSummary, DatasetError>
    where
        W: DatasetWriter + ?Sized,
    {
        let author = AuthorIdentifier::normalize(raw_input);
        if author.is_empty() {
            debug!("Empty author input, nothing to do");
            return Ok(HarvestSummary::default());
        }

        self.emit(HarvestEvent::DiscoveryStarted {
            author: author.to_string(),
            catalog_url: self.engine.catalog_url(&author),
        })
        .await;

        let report = self.engine.discover_with_report(&author, &self.shutdown).await;
        let links = report.links;

        self.emit(HarvestEvent::DiscoveryFinished {
            links: links.len(),
            cycles: report.cycles,
            reason: report.reason.clone(),
        })
        .await;

        let mut summary = HarvestSummary {
            total_links: links.len(),
            ..HarvestSummary::default()
        };

        if links.is_empty() {
            info!("No links found for {}", author);
            summary.interrupted = report.reason == StopReason::Cancelled;
            self.emit(HarvestEvent::Finished(summary)).await;
            return Ok(summary);
        }
        if self.shutdown.is_triggered() {
            summary.interrupted = true;
            self.emit(HarvestEvent::Finished(summary)).await;
            return Ok(summary);
        }

        dataset.begin(&author)?;

        let total = links.len();
        let mut shutdown = self.shutdown.clone();

        for (index, url) in links.iter().enumerate() {
            if shutdown.is_triggered() {
                summary.interrupted = true;
                break;
            }

            self.emit(HarvestEvent::ItemStarted {
                index,
                total,
                url: url.to_string(),
            })
            .await;

            match self.extractor.extract_detailed(url.as_str()).await {
                Extraction::Body(body) => {
                    dataset.write_record(&VerseRecord::new(&author, body, url))?;
                    summary.successes += 1;
                    info!("[{}/{}] Saved {}", index + 1, total, url.slug());
                    self.emit(HarvestEvent::ItemSaved {
                        index,
                        url: url.to_string(),
                    })
                    .await;
                }
                Extraction::Empty => {
                    summary.skipped_empty += 1;
                    info!("[{}/{}] No verses in {}", index + 1, total, url.slug());
                    self.emit(HarvestEvent::ItemSkipped {
                        index,
                        url: url.to_string(),
                        reason: "no valid verses".to_string(),
                    })
                    .await;
                }
                Extraction::Unavailable(reason) => {
                    summary.skipped_unavailable += 1;
                    warn!("[{}/{}] Skipped {}: {}", index + 1, total, url.slug(), reason);
                    self.emit(HarvestEvent::ItemSkipped {
                        index,
                        url: url.to_string(),
                        reason,
                    })
                    .await;
                }
                Extraction::Cancelled => {
                    summary.interrupted = true;
                    break;
                }
            }

            if index + 1 < total {
                let pause = self.pacer.wait_between(index);
                if !shutdown.sleep(pause).await {
                    summary.interrupted = true;
                    break;
                }
            }
        }

        dataset.finish()?;

        if summary.interrupted {
            warn!(
                "Harvest interrupted after {} of {} items",
                summary.processed(),
                total
            );
        }
        info!(
            "Harvest of {} finished: {} saved of {} links",
            author, summary.successes, summary.total_links
        );

        self.emit(HarvestEvent::Finished(summary)).await;
        Ok(summary)
    }
}
