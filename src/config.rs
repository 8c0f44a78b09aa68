//! Configuration management using the prefer crate for file discovery.
//!
//! Layering: defaults, then a discovered (or explicit) config file, then
//! environment overrides. CLI flags are applied last by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name used for config file discovery (`rekhta-harvest.toml`, etc.).
pub const CONFIG_NAME: &str = "rekhta-harvest";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Target site layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root, without trailing slash.
    pub base_url: String,
    /// Catalog section, also the path marker of item links (`/ghazals/`).
    pub content_type: String,
    /// Value of the `lang` query parameter.
    pub locale: String,
    /// Site brand fragment that must not appear in a verse.
    pub brand_token: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.rekhta.org".to_string(),
            content_type: "ghazals".to_string(),
            locale: "hi".to_string(),
            brand_token: "rekhta".to_string(),
        }
    }
}

impl SiteConfig {
    /// `{base}/poets/{identifier}/{content-type}?lang={locale}`
    pub fn catalog_url(&self, identifier: &str) -> String {
        format!(
            "{}/poets/{}/{}?lang={}",
            self.base_url.trim_end_matches('/'),
            identifier,
            self.content_type,
            self.locale
        )
    }

    /// Path fragment every item link must contain.
    pub fn item_marker(&self) -> String {
        format!("/{}/", self.content_type)
    }
}

/// Infinite-scroll discovery tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Wait after navigation before the baseline height is measured.
    pub initial_settle_ms: u64,
    /// Wait after each scroll for lazy content to render.
    pub settle_ms: u64,
    /// Consecutive no-growth cycles that end discovery.
    pub stagnation_threshold: u32,
    /// Safety ceiling on the number of collected links.
    pub max_links: usize,
    /// Links must be strictly longer than this.
    pub min_link_len: usize,
    /// Anchor classes marking media/favorite controls rather than content.
    pub excluded_classes: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            initial_settle_ms: 3000,
            settle_ms: 2000,
            stagnation_threshold: 3,
            max_links: 3000,
            min_link_len: 40,
            excluded_classes: ["rico-audio", "rico-youtube", "favorite", "rico-favorite"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DiscoveryConfig {
    pub fn initial_settle(&self) -> Duration {
        Duration::from_millis(self.initial_settle_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true).
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    pub proxy: Option<String>,

    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    pub remote_url: Option<String>,

    /// DevTools request timeout in seconds.
    pub timeout: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            proxy: None,
            chrome_args: Vec::new(),
            remote_url: None,
            timeout: 30,
        }
    }
}

impl BrowserConfig {
    /// Apply `BROWSER_URL` and `SOCKS_PROXY` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env("BROWSER_URL") {
            self.remote_url = Some(url);
        }
        if self.proxy.is_none() {
            self.proxy = non_empty_env("SOCKS_PROXY");
        }
        self
    }
}

/// HTTP transport settings for the extraction phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub backoff_base_ms: u64,
    pub retry_statuses: Vec<u16>,
    /// Overrides the desktop Chrome user agent.
    pub user_agent: Option<String>,
    pub accept_language: String,
    /// Referer header. Defaults to `{base_url}/` when unset.
    pub referer: Option<String>,
    /// Proxy for all requests (e.g., "socks5://127.0.0.1:9050").
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_retries: 5,
            backoff_base_ms: 1000,
            retry_statuses: vec![429, 500, 502, 503, 504],
            user_agent: None,
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: None,
            proxy: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if self.proxy.is_none() {
            self.proxy = non_empty_env("SOCKS_PROXY");
        }
        self
    }
}

/// Verse selection and validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractConfig {
    /// CSS selector for verse elements inside the content container.
    pub selector: String,
    /// Verses must be strictly longer than this many characters.
    pub min_verse_len: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            selector: ".c p".to_string(),
            min_verse_len: 5,
        }
    }
}

/// Politeness window between extraction requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PacingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 500,
            max_ms: 1500,
        }
    }
}

/// Dataset output location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for `{identifier}_dataset.csv`. Defaults to the working directory.
    pub dir: Option<String>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub discovery: DiscoveryConfig,
    pub browser: BrowserConfig,
    pub http: HttpConfig,
    pub extract: ExtractConfig,
    pub pacing: PacingConfig,
    pub output: OutputConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, discovering a config file with prefer unless an
    /// explicit path is given. Missing or unreadable discovered files fall
    /// back to defaults; an explicit path that fails is an error.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_path(path).await?,
            None => match prefer::load(CONFIG_NAME).await {
                Ok(pref_config) => match pref_config.source_path() {
                    Some(path) => match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                            Self::default()
                        }
                    },
                    None => Self::default(),
                },
                Err(_) => Self::default(),
            },
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    /// Format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.browser = self.browser.with_env_overrides();
        self.http = self.http.with_env_overrides();
        self
    }

    /// Reject values that would make a phase misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.content_type.trim().is_empty() {
            return Err(ConfigError::Invalid("site.content_type is empty".into()));
        }
        if self.site.locale.trim().is_empty() {
            return Err(ConfigError::Invalid("site.locale is empty".into()));
        }
        if url::Url::parse(&self.site.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "site.base_url is not a URL: {}",
                self.site.base_url
            )));
        }
        if self.discovery.stagnation_threshold == 0 {
            return Err(ConfigError::Invalid(
                "discovery.stagnation_threshold must be at least 1".into(),
            ));
        }
        if self.pacing.min_ms > self.pacing.max_ms {
            return Err(ConfigError::Invalid(format!(
                "pacing.min_ms ({}) exceeds pacing.max_ms ({})",
                self.pacing.min_ms, self.pacing.max_ms
            )));
        }
        if scraper::Selector::parse(&self.extract.selector).is_err() {
            return Err(ConfigError::Invalid(format!(
                "extract.selector is not valid CSS: {}",
                self.extract.selector
            )));
        }
        Ok(())
    }

    /// Referer header, defaulting to the site root.
    pub fn referer(&self) -> String {
        self.http
            .referer
            .clone()
            .unwrap_or_else(|| format!("{}/", self.site.base_url.trim_end_matches('/')))
    }

    /// Directory for the dataset file, with `~` expanded.
    pub fn output_dir(&self) -> PathBuf {
        match self.output.dir {
            Some(ref dir) => PathBuf::from(shellexpand::tilde(dir).as_ref()),
            None => PathBuf::from("."),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_site_behavior() {
        let config = Config::default();
        assert_eq!(config.discovery.stagnation_threshold, 3);
        assert_eq!(config.discovery.max_links, 3000);
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.http.timeout(), Duration::from_secs(15));
        assert_eq!(config.http.retry_statuses, vec![429, 500, 502, 503, 504]);
        assert_eq!(config.extract.selector, ".c p");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_catalog_url() {
        let site = SiteConfig::default();
        assert_eq!(
            site.catalog_url("jaun-eliya"),
            "https://www.rekhta.org/poets/jaun-eliya/ghazals?lang=hi"
        );
        assert_eq!(site.item_marker(), "/ghazals/");
    }

    #[test]
    fn test_parse_toml_partial() {
        let config = Config::parse(
            r#"
            [site]
            content_type = "nazms"
            locale = "ur"

            [discovery]
            max_links = 50
            "#,
            "toml",
        )
        .unwrap();
        assert_eq!(config.site.content_type, "nazms");
        assert_eq!(config.site.locale, "ur");
        assert_eq!(config.site.base_url, "https://www.rekhta.org");
        assert_eq!(config.discovery.max_links, 50);
        assert_eq!(config.discovery.stagnation_threshold, 3);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse("pacing:\n  min_ms: 0\n  max_ms: 0\n", "yml").unwrap();
        assert_eq!(yaml.pacing.max_ms, 0);

        let json = Config::parse(r#"{"http": {"max_retries": 2}}"#, "json").unwrap();
        assert_eq!(json.http.max_retries, 2);
        assert_eq!(json.http.backoff_base_ms, 1000);
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = Config::parse("site = [", "toml").unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.pacing.min_ms = 2000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.discovery.stagnation_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extract.selector = "p[".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.site.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_referer_defaults_to_site_root() {
        let mut config = Config::default();
        assert_eq!(config.referer(), "https://www.rekhta.org/");
        config.http.referer = Some("https://example.org/x".into());
        assert_eq!(config.referer(), "https://example.org/x");
    }

    #[tokio::test]
    async fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.toml");
        std::fs::write(&path, "[extract]\nmin_verse_len = 8\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.extract.min_verse_len, 8);
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_load_missing_explicit_path_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/harvest.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
