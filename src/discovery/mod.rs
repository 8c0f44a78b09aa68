//! Catalog link discovery over an infinite-scroll page.
//!
//! The engine scrolls the catalog, harvests item links from each rendered
//! snapshot, and stops once the document height has stayed the same for
//! `stagnation_threshold` consecutive cycles (or the link ceiling is hit).
//! It never fails outward: launch or automation faults end discovery early
//! and whatever was collected so far is returned.

mod links;
mod surface;

pub use links::{LinkFilter, LinkFilterError, LinkSet};
pub use surface::{ScrollSurface, SurfaceError, SurfaceLauncher};

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{DiscoveryConfig, SiteConfig};
use crate::identifier::AuthorIdentifier;
use crate::models::ItemUrl;
use crate::shutdown::Shutdown;

/// Why discovery stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Height unchanged for the configured number of cycles.
    Stagnated,
    /// Link ceiling exceeded.
    Ceiling,
    /// Shutdown requested.
    Cancelled,
    /// Browser could not be started.
    LaunchFailed(String),
    /// Automation fault mid-run; partial results kept.
    Fault(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Stagnated => write!(f, "page stopped growing"),
            StopReason::Ceiling => write!(f, "link ceiling reached"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::LaunchFailed(e) => write!(f, "browser launch failed: {}", e),
            StopReason::Fault(e) => write!(f, "browser fault: {}", e),
        }
    }
}

/// Result of one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub catalog_url: String,
    /// Sorted, deduplicated item links.
    pub links: Vec<ItemUrl>,
    /// Scroll cycles performed.
    pub cycles: u32,
    pub reason: StopReason,
}

/// Drives a `ScrollSurface` until the catalog stops growing.
pub struct LinkDiscoveryEngine<L> {
    launcher: L,
    site: SiteConfig,
    config: DiscoveryConfig,
    filter: LinkFilter,
}

impl<L: SurfaceLauncher> LinkDiscoveryEngine<L> {
    pub fn new(
        launcher: L,
        site: SiteConfig,
        config: DiscoveryConfig,
    ) -> Result<Self, LinkFilterError> {
        let filter = LinkFilter::new(&site, &config)?;
        Ok(Self {
            launcher,
            site,
            config,
            filter,
        })
    }

    pub fn catalog_url(&self, identifier: &AuthorIdentifier) -> String {
        self.site.catalog_url(identifier.as_str())
    }

    /// Discover every item link for `identifier`, sorted.
    pub async fn discover(&self, identifier: &AuthorIdentifier, shutdown: &Shutdown) -> Vec<ItemUrl> {
        self.discover_with_report(identifier, shutdown).await.links
    }

    /// Like `discover`, with cycle count and stop reason.
    pub async fn discover_with_report(
        &self,
        identifier: &AuthorIdentifier,
        shutdown: &Shutdown,
    ) -> DiscoveryReport {
        let catalog_url = self.catalog_url(identifier);
        info!("Discovering links from {}", catalog_url);

        let mut surface = match self.launcher.launch().await {
            Ok(surface) => surface,
            Err(e) => {
                warn!("Discovery aborted: {}", e);
                return DiscoveryReport {
                    catalog_url,
                    links: Vec::new(),
                    cycles: 0,
                    reason: StopReason::LaunchFailed(e.to_string()),
                };
            }
        };

        let mut links = LinkSet::new();
        let mut cycles = 0u32;
        let mut shutdown = shutdown.clone();

        let result = self
            .scroll_until_stable(&mut surface, &catalog_url, &mut links, &mut cycles, &mut shutdown)
            .await;

        surface.close().await;

        let reason = match result {
            Ok(reason) => reason,
            Err(e) => {
                warn!(
                    "Discovery stopped after {} cycles: {} (keeping {} links)",
                    cycles,
                    e,
                    links.len()
                );
                StopReason::Fault(e.to_string())
            }
        };

        info!(
            "Discovery finished: {} unique links in {} cycles ({})",
            links.len(),
            cycles,
            reason
        );

        DiscoveryReport {
            catalog_url,
            links: links.into_sorted(),
            cycles,
            reason,
        }
    }

    async fn scroll_until_stable<S: ScrollSurface>(
        &self,
        surface: &mut S,
        catalog_url: &str,
        links: &mut LinkSet,
        cycles: &mut u32,
        shutdown: &mut Shutdown,
    ) -> Result<StopReason, SurfaceError> {
        // Page loads and script calls are abandoned on shutdown like the settles.
        macro_rules! or_cancel {
            ($call:expr) => {
                match shutdown.until($call).await {
                    Some(result) => result?,
                    None => return Ok(StopReason::Cancelled),
                }
            };
        }

        or_cancel!(surface.navigate(catalog_url));
        if !shutdown.sleep(self.config.initial_settle()).await {
            return Ok(StopReason::Cancelled);
        }

        let mut last_height = or_cancel!(surface.measure_extent());
        let mut stagnant = 0u32;

        loop {
            or_cancel!(surface.trigger_growth());
            if !shutdown.sleep(self.config.settle()).await {
                return Ok(StopReason::Cancelled);
            }

            let markup = or_cancel!(surface.snapshot_markup());
            let added = links.extend(self.filter.extract(&markup));
            *cycles += 1;

            let height = or_cancel!(surface.measure_extent());
            if height == last_height {
                stagnant += 1;
            } else {
                stagnant = 0;
            }

            debug!(
                "Cycle {}: height {} -> {}, +{} links ({} total), stagnant {}/{}",
                cycles,
                last_height,
                height,
                added,
                links.len(),
                stagnant,
                self.config.stagnation_threshold
            );

            if stagnant >= self.config.stagnation_threshold {
                return Ok(StopReason::Stagnated);
            }
            last_height = height;

            if links.len() > self.config.max_links {
                warn!(
                    "Stopping discovery at {} links (ceiling {})",
                    links.len(),
                    self.config.max_links
                );
                return Ok(StopReason::Ceiling);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{anchor_page, ScriptedLauncher, ScriptedSurface};

    fn config() -> DiscoveryConfig {
        DiscoveryConfig {
            initial_settle_ms: 0,
            settle_ms: 0,
            ..DiscoveryConfig::default()
        }
    }

    fn engine(surface: ScriptedSurface) -> (LinkDiscoveryEngine<ScriptedLauncher>, ScriptedLauncher) {
        let launcher = ScriptedLauncher::new(surface);
        let engine =
            LinkDiscoveryEngine::new(launcher.clone(), SiteConfig::default(), config()).unwrap();
        (engine, launcher)
    }

    fn slug(n: usize) -> String {
        format!("/ghazals/ghazal-number-{}-jaun-eliya-ghazals", n)
    }

    fn id() -> AuthorIdentifier {
        AuthorIdentifier::normalize("Jaun Eliya")
    }

    #[tokio::test]
    async fn test_terminates_three_cycles_after_last_growth() {
        // Baseline 1000, grows for three cycles, then flat.
        let heights = vec![1000, 2000, 3000, 4000, 4000, 4000, 4000, 4000, 4000];
        let snapshots: Vec<String> = (1..=9)
            .map(|cycle| anchor_page(&(1..=cycle).map(slug).collect::<Vec<_>>()))
            .collect();
        let (engine, launcher) = engine(ScriptedSurface::new(heights, snapshots));

        let report = engine.discover_with_report(&id(), &Shutdown::never()).await;

        assert_eq!(report.reason, StopReason::Stagnated);
        assert_eq!(report.cycles, 6);
        assert_eq!(report.links.len(), 6);
        let log = launcher.log();
        assert_eq!(log.snapshots, 6);
        assert_eq!(log.growth_calls, 6);
        assert!(log.closed);
        assert_eq!(
            log.navigated,
            vec!["https://www.rekhta.org/poets/jaun-eliya/ghazals?lang=hi".to_string()]
        );
    }

    #[tokio::test]
    async fn test_growth_resets_stagnation() {
        // Two flat cycles, then growth, then three flat.
        let heights = vec![500, 500, 500, 900, 900, 900, 900];
        let (engine, _) = engine(ScriptedSurface::new(heights, vec![anchor_page(&[slug(1)])]));

        let report = engine.discover_with_report(&id(), &Shutdown::never()).await;
        assert_eq!(report.reason, StopReason::Stagnated);
        assert_eq!(report.cycles, 6);
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let heights = vec![100, 100];
        let launcher = ScriptedLauncher::new(ScriptedSurface::new(heights, vec![anchor_page(&[])]));
        let engine = LinkDiscoveryEngine::new(
            launcher,
            SiteConfig::default(),
            DiscoveryConfig {
                stagnation_threshold: 1,
                ..config()
            },
        )
        .unwrap();

        let report = engine.discover_with_report(&id(), &Shutdown::never()).await;
        assert_eq!(report.cycles, 1);
        assert!(report.links.is_empty());
    }

    #[tokio::test]
    async fn test_dedup_and_filter_across_snapshots() {
        let first = anchor_page(&[slug(1), slug(2)]);
        let second = format!(
            r#"<html><body>
            <a href="{a}">again</a>
            <a href="https://www.rekhta.org{a}?lang=hi">again with lang</a>
            <a class="rico-youtube" href="{c}">video</a>
            <a href="{b}">new</a>
            </body></html>"#,
            a = slug(1),
            b = slug(3),
            c = slug(4)
        );
        let heights = vec![10, 20, 20, 20, 20];
        let (engine, _) = engine(ScriptedSurface::new(heights, vec![first, second]));

        let links = engine.discover(&id(), &Shutdown::never()).await;
        let links: Vec<&str> = links.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://www.rekhta.org/ghazals/ghazal-number-1-jaun-eliya-ghazals?lang=hi",
                "https://www.rekhta.org/ghazals/ghazal-number-2-jaun-eliya-ghazals?lang=hi",
                "https://www.rekhta.org/ghazals/ghazal-number-3-jaun-eliya-ghazals?lang=hi",
            ]
        );
    }

    #[tokio::test]
    async fn test_ceiling_stops_growing_page() {
        // Height always grows; only the ceiling can stop it.
        let heights: Vec<u64> = (1..=100).map(|h| h * 100).collect();
        let snapshots: Vec<String> = (0..100)
            .map(|cycle| anchor_page(&(cycle * 3..cycle * 3 + 3).map(slug).collect::<Vec<_>>()))
            .collect();
        let launcher = ScriptedLauncher::new(ScriptedSurface::new(heights, snapshots));
        let engine = LinkDiscoveryEngine::new(
            launcher.clone(),
            SiteConfig::default(),
            DiscoveryConfig {
                max_links: 10,
                ..config()
            },
        )
        .unwrap();

        let report = engine.discover_with_report(&id(), &Shutdown::never()).await;
        assert_eq!(report.reason, StopReason::Ceiling);
        assert_eq!(report.links.len(), 12);
        assert_eq!(report.cycles, 4);
        assert!(launcher.log().closed);
    }

    #[tokio::test]
    async fn test_fault_keeps_partial_links_and_closes() {
        let heights = vec![10, 20, 30, 40];
        let snapshots = vec![anchor_page(&[slug(1)]), anchor_page(&[slug(2)])];
        let surface = ScriptedSurface::new(heights, snapshots).fail_growth_at(3);
        let (engine, launcher) = engine(surface);

        let report = engine.discover_with_report(&id(), &Shutdown::never()).await;
        assert!(matches!(report.reason, StopReason::Fault(_)));
        assert_eq!(report.links.len(), 2);
        assert!(launcher.log().closed);
    }

    #[tokio::test]
    async fn test_launch_failure_yields_empty() {
        let launcher = ScriptedLauncher::failing("no chrome");
        let engine =
            LinkDiscoveryEngine::new(launcher, SiteConfig::default(), config()).unwrap();

        let report = engine.discover_with_report(&id(), &Shutdown::never()).await;
        assert!(report.links.is_empty());
        assert!(matches!(report.reason, StopReason::LaunchFailed(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_cycle_still_closes() {
        let (trigger, shutdown) = Shutdown::new();
        trigger.trigger();
        let (engine, launcher) = engine(ScriptedSurface::new(vec![1], vec![anchor_page(&[])]));

        let report = engine.discover_with_report(&id(), &shutdown).await;
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.cycles, 0);
        assert!(launcher.log().closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_slow_page_load() {
        let (trigger, shutdown) = Shutdown::new();
        let surface = ScriptedSurface::new(vec![1], vec![anchor_page(&[])])
            .slow_navigate(std::time::Duration::from_secs(30));
        let (engine, launcher) = engine(surface);

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            trigger.trigger();
        });

        let start = tokio::time::Instant::now();
        let report = engine.discover_with_report(&id(), &shutdown).await;
        assert_eq!(start.elapsed(), std::time::Duration::from_secs(1));
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.cycles, 0);
        let log = launcher.log();
        assert_eq!(log.measurements, 0);
        assert!(log.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delays_are_applied() {
        let launcher = ScriptedLauncher::new(ScriptedSurface::new(
            vec![100, 100, 100, 100],
            vec![anchor_page(&[])],
        ));
        let engine = LinkDiscoveryEngine::new(
            launcher,
            SiteConfig::default(),
            DiscoveryConfig::default(),
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        let report = engine.discover_with_report(&id(), &Shutdown::never()).await;
        assert_eq!(report.cycles, 3);
        // 3s initial settle + 3 cycles x 2s
        assert_eq!(start.elapsed(), std::time::Duration::from_secs(9));
    }
}
