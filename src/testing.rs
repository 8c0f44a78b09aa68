//! Scripted fakes for the browser and HTTP seams.
//!
//! Compiled for unit tests, and for the integration tests under `tests/`
//! through the `testing` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::discovery::{ScrollSurface, SurfaceError, SurfaceLauncher};
use crate::http_client::{Transport, TransportError, TransportResponse};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Minimal catalog page linking to each of `hrefs`.
pub fn anchor_page(hrefs: &[String]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|h| format!("<a class=\"ghazal-link\" href=\"{}\">{}</a>\n", h, h))
        .collect();
    format!("<html><body><div class=\"contentList\">\n{}</div></body></html>", anchors)
}

/// Minimal item page with each line in a `.c p` element.
pub fn verse_page(lines: &[&str]) -> String {
    let paras: String = lines.iter().map(|l| format!("<p>{}</p>\n", l)).collect();
    format!(
        "<html><body><div class=\"c\">\n{}</div><footer><p>Rekhta</p></footer></body></html>",
        paras
    )
}

/// Transport answering from per-URL queues of canned responses.
///
/// The last queued response is not repeated; an exhausted or unscripted URL
/// yields a permanent transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<TransportResponse, TransportError>>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, url: &str, response: Result<TransportResponse, TransportError>) -> Self {
        lock(&self.responses)
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn ok(self, url: &str, body: &str) -> Self {
        self.push(
            url,
            Ok(TransportResponse {
                status: 200,
                retry_after: None,
                body: body.to_string(),
            }),
        )
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.push(
            url,
            Ok(TransportResponse {
                status,
                retry_after: None,
                body: String::new(),
            }),
        )
    }

    pub fn status_with_retry_after(self, url: &str, status: u16, retry_after: &str) -> Self {
        self.push(
            url,
            Ok(TransportResponse {
                status,
                retry_after: Some(retry_after.to_string()),
                body: String::new(),
            }),
        )
    }

    pub fn error(self, url: &str, error: TransportError) -> Self {
        self.push(url, Err(error))
    }

    /// Requests made for `url` so far.
    pub fn calls(&self, url: &str) -> usize {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        *lock(&self.calls).entry(url.to_string()).or_default() += 1;
        lock(&self.responses)
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(TransportError::Other(format!("unscripted url {}", url))))
    }
}

/// What a `ScriptedSurface` was asked to do.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    pub navigated: Vec<String>,
    pub growth_calls: usize,
    pub snapshots: usize,
    pub measurements: usize,
    pub closed: bool,
}

/// Page whose heights and markup follow a script.
///
/// Heights are consumed one per measurement (the first is the baseline);
/// snapshots one per cycle. Both repeat their last entry once exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedSurface {
    heights: Vec<u64>,
    snapshots: Vec<String>,
    fail_growth_at: Option<usize>,
    navigate_delay: Duration,
    log: Arc<Mutex<SurfaceLog>>,
}

impl ScriptedSurface {
    pub fn new(heights: Vec<u64>, snapshots: Vec<String>) -> Self {
        Self {
            heights,
            snapshots,
            fail_growth_at: None,
            navigate_delay: Duration::ZERO,
            log: Arc::new(Mutex::new(SurfaceLog::default())),
        }
    }

    /// Make the `n`th scroll (1-based) fail.
    pub fn fail_growth_at(mut self, n: usize) -> Self {
        self.fail_growth_at = Some(n);
        self
    }

    /// Make page loads take `delay`.
    pub fn slow_navigate(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    fn pick<T: Clone>(items: &[T], index: usize) -> Option<T> {
        items.get(index).or_else(|| items.last()).cloned()
    }
}

#[async_trait]
impl ScrollSurface for ScriptedSurface {
    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        lock(&self.log).navigated.push(url.to_string());
        if !self.navigate_delay.is_zero() {
            tokio::time::sleep(self.navigate_delay).await;
        }
        Ok(())
    }

    async fn trigger_growth(&mut self) -> Result<(), SurfaceError> {
        let mut log = lock(&self.log);
        log.growth_calls += 1;
        if self.fail_growth_at == Some(log.growth_calls) {
            return Err(SurfaceError::Script("scripted scroll failure".into()));
        }
        Ok(())
    }

    async fn snapshot_markup(&mut self) -> Result<String, SurfaceError> {
        let mut log = lock(&self.log);
        let index = log.snapshots;
        log.snapshots += 1;
        Ok(Self::pick(&self.snapshots, index).unwrap_or_default())
    }

    async fn measure_extent(&mut self) -> Result<u64, SurfaceError> {
        let mut log = lock(&self.log);
        let index = log.measurements;
        log.measurements += 1;
        Ok(Self::pick(&self.heights, index).unwrap_or(0))
    }

    async fn close(&mut self) {
        lock(&self.log).closed = true;
    }
}

/// Hands out one scripted surface, or fails to launch.
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    surface: Option<ScriptedSurface>,
    failure: Option<String>,
    log: Arc<Mutex<SurfaceLog>>,
}

impl ScriptedLauncher {
    pub fn new(surface: ScriptedSurface) -> Self {
        let log = surface.log.clone();
        Self {
            surface: Some(surface),
            failure: None,
            log,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            surface: None,
            failure: Some(message.to_string()),
            log: Arc::new(Mutex::new(SurfaceLog::default())),
        }
    }

    /// Snapshot of the surface's activity.
    pub fn log(&self) -> SurfaceLog {
        lock(&self.log).clone()
    }
}

#[async_trait]
impl SurfaceLauncher for ScriptedLauncher {
    type Surface = ScriptedSurface;

    async fn launch(&self) -> Result<ScriptedSurface, SurfaceError> {
        match (&self.surface, &self.failure) {
            (_, Some(message)) => Err(SurfaceError::Launch(message.clone())),
            (Some(surface), None) => Ok(surface.clone()),
            (None, None) => Err(SurfaceError::Launch("no surface scripted".into())),
        }
    }
}
