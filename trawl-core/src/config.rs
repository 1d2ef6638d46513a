//! Layered settings: defaults, then an optional TOML file, then `TRAWL_*`
//! environment variables.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;
use tracing::{debug, warn};
use trawl_scanner::CrawlerConfig;

pub const ENV_PREFIX: &str = "TRAWL_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidOverride { var: String, value: String },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
    pub crawler: CrawlerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            crawler: CrawlerConfig::default(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid by `path` if given, overlaid by the process environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(std::env::vars())?;
        settings.validate();
        Ok(settings)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let raw = fs::read_to_string(expanded.as_ref()).map_err(|source| ConfigError::Io {
            path: expanded.to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: expanded.to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply every `TRAWL_*` pair in `vars`. Unrecognised names are ignored.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (var, value) in vars {
            let Some(field) = var.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if self.apply_override(field, &value)? {
                debug!("{} overridden from environment", var);
            } else {
                debug!("Ignoring unrecognised variable {}", var);
            }
        }
        Ok(())
    }

    fn apply_override(&mut self, field: &str, value: &str) -> Result<bool> {
        let var = format!("{}{}", ENV_PREFIX, field);
        let crawler = &mut self.crawler;
        let browser = &mut crawler.browser;

        match field {
            "LOG_LEVEL" => self.log_level = value.trim().to_string(),
            "USER_AGENT" => crawler.user_agent = value.to_string(),
            "REQUEST_TIMEOUT_SECS" => crawler.request_timeout_secs = parse_scalar(&var, value)?,
            "CRAWL_DELAY_MS" => crawler.crawl_delay_ms = parse_scalar(&var, value)?,
            "MAX_CONCURRENT_REQUESTS" => {
                crawler.max_concurrent_requests = parse_scalar(&var, value)?
            }
            "BATCH_SIZE" => crawler.batch_size = parse_scalar(&var, value)?,
            "STAY_IN_DOMAIN" => crawler.stay_in_domain = parse_bool(&var, value)?,
            "SKIP_EXTENSIONS" => crawler.skip_extensions = parse_list(value),
            "IGNORE_PATTERNS" => crawler.ignore_patterns = parse_list(value),
            "STRATEGY" => crawler.strategy = parse_enum(&var, value)?,
            "MODE" => crawler.mode = parse_enum(&var, value)?,
            "SAVE_HTML" => crawler.save_html = parse_bool(&var, value)?,
            "BROWSER_WAIT" => browser.wait = parse_enum(&var, value)?,
            "BROWSER_WAIT_SELECTOR" => browser.wait_selector = value.to_string(),
            "BROWSER_SETTLE_MS" => browser.settle_ms = parse_scalar(&var, value)?,
            "BROWSER_TIMEOUT_SECS" => browser.timeout_secs = parse_scalar(&var, value)?,
            "BROWSER_EXECUTABLE_PATH" => {
                browser.executable_path = Some(shellexpand::tilde(value).to_string())
            }
            "BROWSER_HEADLESS" => browser.headless = parse_bool(&var, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Clamp limits that would stall the engine.
    pub fn validate(&mut self) {
        if self.crawler.max_concurrent_requests == 0 {
            warn!("max_concurrent_requests must be at least 1, using 1");
            self.crawler.max_concurrent_requests = 1;
        }
        if self.crawler.batch_size == 0 {
            warn!("batch_size must be at least 1, using 1");
            self.crawler.batch_size = 1;
        }
    }
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidOverride {
        var: var.to_string(),
        value: value.to_string(),
    }
}

fn parse_scalar<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(var, value))
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value)),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Enum overrides accept the same snake_case names as the config file.
fn parse_enum<T: DeserializeOwned>(var: &str, value: &str) -> Result<T> {
    let name = value.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(name)).map_err(|_| invalid(var, value))
}
