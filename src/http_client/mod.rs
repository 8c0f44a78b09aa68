//! HTTP transport for the extraction phase.
//!
//! `Transport` is the seam the extractor depends on; `HttpClient` is the
//! reqwest implementation with the browser-like header set, and
//! `RetryingClient` layers the retry/backoff policy on top of any transport.

mod retry;
mod user_agent;

pub use retry::{backoff_delay, parse_retry_after, FetchOutcome, RetryPolicy, RetryingClient};
pub use user_agent::{resolve_user_agent, BROWSER_USER_AGENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Proxy};
use tracing::debug;

use crate::config::Config;

/// Errors from a single request attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("connection dropped while reading body: {0}")]
    Interrupted(String),
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Connection-level faults worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_) | TransportError::Timeout | TransportError::Interrupted(_)
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() || e.is_request() {
            TransportError::Interrupted(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// One response as seen by the retry layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Raw `Retry-After` header, if any.
    pub retry_after: Option<String>,
    /// Body text. Only read for 200 responses.
    pub body: String,
}

/// A single GET with no retry of its own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// Reusable reqwest client presenting as an ordinary browser.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

/// Builder for constructing `HttpClient` with optional configuration.
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    accept_language: Option<String>,
    referer: Option<String>,
    proxy: Option<String>,
}

impl HttpClientBuilder {
    /// Override the desktop Chrome user agent.
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    pub fn accept_language(mut self, value: &str) -> Self {
        self.accept_language = Some(value.to_string());
        self
    }

    /// Set the Referer header for requests.
    pub fn referer(mut self, referer: &str) -> Self {
        self.referer = Some(referer.to_string());
        self
    }

    /// Route all requests through a proxy (http, https or socks5 URL).
    pub fn proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    /// Build the `HttpClient`.
    pub fn build(self) -> Result<HttpClient, TransportError> {
        let user_agent = resolve_user_agent(self.user_agent.as_deref());

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&user_agent)?);
        if let Some(ref lang) = self.accept_language {
            headers.insert(ACCEPT_LANGUAGE, header_value(lang)?);
        }
        if let Some(ref referer) = self.referer {
            headers.insert(REFERER, header_value(referer)?);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true);

        if let Some(ref proxy) = self.proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| TransportError::Other(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(HttpClient {
            client,
            timeout: self.timeout,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value)
        .map_err(|e| TransportError::Other(format!("invalid header value {:?}: {}", value, e)))
}

impl HttpClient {
    pub fn builder(timeout: Duration) -> HttpClientBuilder {
        HttpClientBuilder {
            timeout,
            user_agent: None,
            accept_language: None,
            referer: None,
            proxy: None,
        }
    }

    /// Build from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let mut builder = Self::builder(config.http.timeout())
            .accept_language(&config.http.accept_language)
            .referer(&config.referer());
        if let Some(ref ua) = config.http.user_agent {
            builder = builder.user_agent(ua);
        }
        if let Some(ref proxy) = config.http.proxy {
            builder = builder.proxy(proxy);
        }
        builder.build()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = if status == 200 {
            response.text().await?
        } else {
            String::new()
        };

        debug!(
            "GET {} -> {} ({} bytes, {:?})",
            url,
            status,
            body.len(),
            start.elapsed()
        );

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let client = HttpClient::builder(Duration::from_secs(15))
            .accept_language("en-US,en;q=0.9")
            .referer("https://www.rekhta.org/")
            .build();
        assert!(client.is_ok());
        assert_eq!(client.unwrap().timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_builder_rejects_bad_header() {
        let client = HttpClient::builder(Duration::from_secs(1))
            .referer("bad\nvalue")
            .build();
        assert!(matches!(client, Err(TransportError::Other(_))));
    }

    #[test]
    fn test_from_default_config() {
        let client = HttpClient::from_config(&Config::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::Connect("refused".into()).is_transient());
        assert!(TransportError::Interrupted("reset".into()).is_transient());
        assert!(!TransportError::Other("bad url".into()).is_transient());
    }
}
