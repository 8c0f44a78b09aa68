//! User-Agent selection for item page requests.

/// Desktop Chrome string the catalog site serves full pages to.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configured override, or the desktop Chrome string. Blank overrides are
/// treated as unset.
pub fn resolve_user_agent(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .unwrap_or(BROWSER_USER_AGENT)
        .to_string()
}
