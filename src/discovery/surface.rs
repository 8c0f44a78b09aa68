//! Capability interface over a rendered, scrollable page.
//!
//! The discovery loop only needs these five operations, so a real browser
//! and a scripted fake are interchangeable behind it.

use async_trait::async_trait;

/// Errors from browser automation.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("failed to start browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("browser session closed")]
    Closed,
}

/// An open page that can be grown by scrolling.
#[async_trait]
pub trait ScrollSurface: Send {
    /// Load `url` in the page.
    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError>;

    /// Scroll to the current bottom of the document.
    async fn trigger_growth(&mut self) -> Result<(), SurfaceError>;

    /// Current rendered markup.
    async fn snapshot_markup(&mut self) -> Result<String, SurfaceError>;

    /// Current scrollable height of the document.
    async fn measure_extent(&mut self) -> Result<u64, SurfaceError>;

    /// Release the session. Must be safe to call after a failure.
    async fn close(&mut self);
}

/// Opens a fresh surface for one discovery run.
#[async_trait]
pub trait SurfaceLauncher: Send + Sync {
    type Surface: ScrollSurface;

    async fn launch(&self) -> Result<Self::Surface, SurfaceError>;
}
