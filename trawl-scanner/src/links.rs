use crate::config::CrawlerConfig;
use tracing::debug;
use url::Url;

/// Resolve `href` against `base` and canonicalize it to `scheme://host[:port]/path[?query]`.
///
/// Returns `None` for empty and fragment-only references, for non-navigational
/// schemes (`javascript:`, `mailto:`, `tel:`, `data:`) and for anything that
/// does not resolve to an http(s) URL with a host.
pub fn normalize(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") || resolved.host_str().is_none() {
        return None;
    }

    resolved.set_fragment(None);
    // Credentials never take part in identity.
    let _ = resolved.set_username("");
    let _ = resolved.set_password(None);
    if resolved.query() == Some("") {
        resolved.set_query(None);
    }

    Some(resolved)
}

/// Host plus explicit port, the unit the same-host constraint compares.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Exploration filter applied to normalized links.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    pub same_host: bool,
    pub skip_extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl LinkFilter {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            same_host: config.stay_in_domain,
            skip_extensions: config
                .skip_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            ignore_patterns: config.ignore_patterns.clone(),
        }
    }

    /// Keep the links that pass every predicate, in their original order.
    pub fn filter<I>(&self, urls: I, session_domain: &str) -> Vec<Url>
    where
        I: IntoIterator<Item = Url>,
    {
        urls.into_iter()
            .filter(|url| self.accepts(url, session_domain))
            .collect()
    }

    pub fn accepts(&self, url: &Url, session_domain: &str) -> bool {
        if self.same_host && authority(url).as_deref() != Some(session_domain) {
            debug!("  -> {} is off-host, skipping", url);
            return false;
        }

        let path = url.path().to_ascii_lowercase();
        if self.skip_extensions.iter().any(|ext| path.ends_with(ext.as_str())) {
            debug!("  -> {} has a skipped extension", url);
            return false;
        }

        let full = url.as_str();
        if self
            .ignore_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && full.contains(pattern.as_str()))
        {
            debug!("  -> {} matches an ignore pattern", url);
            return false;
        }

        true
    }
}
