//! Chrome-backed scroll surface for catalog discovery.
//!
//! Launches a local Chrome/Chromium over CDP (chromiumoxide), or attaches
//! to a remote DevTools endpoint when `browser.remote_url` / `BROWSER_URL`
//! is set.

use async_trait::async_trait;

use crate::config::BrowserConfig;
use crate::discovery::{ScrollSurface, SurfaceError, SurfaceLauncher};

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig as ChromeConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
#[cfg(feature = "browser")]
const DOCUMENT_HEIGHT: &str = "document.body.scrollHeight";

/// Starts a Chrome session per discovery run.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

/// One open Chrome page.
#[cfg(feature = "browser")]
pub struct ChromeSurface {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    /// False when attached to a remote browser we must not shut down.
    owned: bool,
}

#[cfg(feature = "browser")]
impl ChromeLauncher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    fn find_chrome() -> Result<PathBuf, SurfaceError> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("Found Chrome in PATH: {}", path);
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(SurfaceError::Launch(
            "Chrome/Chromium not found. Install it or set BROWSER_URL to a running instance"
                .to_string(),
        ))
    }

    fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        })
    }

    async fn launch_local(&self) -> Result<ChromeSurface, SurfaceError> {
        info!("Launching browser (headless={})", self.config.headless);
        let chrome_path = Self::find_chrome()?;

        let mut builder = ChromeConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(Duration::from_secs(self.config.timeout));

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--log-level=3");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let chrome_config = builder
            .build()
            .map_err(|e| SurfaceError::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| SurfaceError::Launch(e.to_string()))?;

        Ok(ChromeSurface {
            browser,
            page: None,
            handler: Self::spawn_handler(handler),
            owned: true,
        })
    }

    async fn connect_remote(&self, url: &str) -> Result<ChromeSurface, SurfaceError> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, self.config.timeout
        );

        // WebSocket URL comes from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| SurfaceError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| SurfaceError::Launch(format!("bad browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SurfaceError::Launch("no webSocketDebuggerUrl in response".into()))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.timeout),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| SurfaceError::Launch(e.to_string()))?;

        Ok(ChromeSurface {
            browser,
            page: None,
            handler: Self::spawn_handler(handler),
            owned: false,
        })
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl SurfaceLauncher for ChromeLauncher {
    type Surface = ChromeSurface;

    async fn launch(&self) -> Result<ChromeSurface, SurfaceError> {
        match self.config.remote_url.clone() {
            Some(url) => self.connect_remote(&url).await,
            None => self.launch_local().await,
        }
    }
}

#[cfg(feature = "browser")]
impl ChromeSurface {
    fn page(&self) -> Result<&Page, SurfaceError> {
        self.page.as_ref().ok_or(SurfaceError::Closed)
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl ScrollSurface for ChromeSurface {
    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        if self.page.is_none() {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| SurfaceError::Navigation(e.to_string()))?;
            self.page = Some(page);
        }
        info!("Navigating to {}", url);
        self.page()?
            .goto(url)
            .await
            .map_err(|e| SurfaceError::Navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn trigger_growth(&mut self) -> Result<(), SurfaceError> {
        self.page()?
            .evaluate(SCROLL_TO_BOTTOM)
            .await
            .map_err(|e| SurfaceError::Script(e.to_string()))?;
        Ok(())
    }

    async fn snapshot_markup(&mut self) -> Result<String, SurfaceError> {
        self.page()?
            .content()
            .await
            .map_err(|e| SurfaceError::Script(e.to_string()))
    }

    async fn measure_extent(&mut self) -> Result<u64, SurfaceError> {
        self.page()?
            .evaluate(DOCUMENT_HEIGHT)
            .await
            .map_err(|e| SurfaceError::Script(e.to_string()))?
            .into_value::<u64>()
            .map_err(|e| SurfaceError::Script(format!("height is not a number: {}", e)))
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }
        if self.owned {
            if let Err(e) = self.browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                debug!("Browser process did not exit cleanly: {}", e);
            }
        }
        self.handler.abort();
    }
}

/// Placeholder surface when built without the `browser` feature.
#[cfg(not(feature = "browser"))]
pub struct ChromeSurface;

#[cfg(not(feature = "browser"))]
fn not_compiled() -> SurfaceError {
    SurfaceError::Launch(
        "Browser support not compiled. Rebuild with: cargo build --features browser".into(),
    )
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl SurfaceLauncher for ChromeLauncher {
    type Surface = ChromeSurface;

    async fn launch(&self) -> Result<ChromeSurface, SurfaceError> {
        Err(not_compiled())
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl ScrollSurface for ChromeSurface {
    async fn navigate(&mut self, _url: &str) -> Result<(), SurfaceError> {
        Err(not_compiled())
    }

    async fn trigger_growth(&mut self) -> Result<(), SurfaceError> {
        Err(not_compiled())
    }

    async fn snapshot_markup(&mut self) -> Result<String, SurfaceError> {
        Err(not_compiled())
    }

    async fn measure_extent(&mut self) -> Result<u64, SurfaceError> {
        Err(not_compiled())
    }

    async fn close(&mut self) {}
}
