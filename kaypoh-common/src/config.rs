//! Configuration loading for Kaypoh services
//!
//! Every setting resolves with the same priority order:
//! 1. Environment variable (a `.env` file is loaded first, best-effort)
//! 2. TOML config file (`KAYPOH_CONFIG`, else `<config_dir>/kaypoh/config.toml`)
//! 3. Compiled default
//!
//! The crawl-service credential has no default. Its absence is a startup
//! configuration error, never a runtime one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CRAWL_BASE_URL: &str = "https://api.apify.com";
/// Google Maps Reviews Scraper actor
pub const DEFAULT_CRAWL_ACTOR_ID: &str = "nwua9Gu5YrADL7ZDj";
pub const DEFAULT_LOCATION: &str = "New York, USA";
pub const DEFAULT_LOCAL_LOCATION: &str = "Singapore";
pub const DEFAULT_CLASSIFIER_URL: &str =
    "https://louistzx-kaypoh-aunty-v2.hf.space/gradio_api/call/classify_batch";
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Optional TOML configuration file contents
///
/// Every field is optional; missing fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub crawl_token: Option<String>,
    pub crawl_base_url: Option<String>,
    pub crawl_actor_id: Option<String>,
    pub default_location: Option<String>,
    pub local_location: Option<String>,
    pub crawl_max_wait_secs: Option<u64>,
    pub crawl_poll_interval_secs: Option<u64>,
    pub classifier_url: Option<String>,
    pub threshold: Option<f64>,
    pub classifier_max_retries: Option<u32>,
    pub classifier_submit_timeout_secs: Option<u64>,
    pub classifier_poll_timeout_secs: Option<u64>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
}

impl TomlConfig {
    /// Read a TOML config file. A missing file yields the empty config.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No TOML config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
    }
}

/// Crawl service settings
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub token: String,
    pub base_url: String,
    pub actor_id: String,
    pub default_location: String,
    pub local_location: String,
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

/// Remote classifier settings
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub url: String,
    pub threshold: f64,
    pub max_retries: u32,
    pub submit_timeout: Duration,
    pub poll_timeout: Duration,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub crawl: CrawlSettings,
    pub classifier: ClassifierSettings,
    pub server: ServerSettings,
}

impl TriageConfig {
    /// Load configuration from `.env`, the process environment and the TOML file.
    pub fn load() -> Result<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        let toml_path = config_file_path();
        let toml_config = match &toml_path {
            Some(path) => TomlConfig::read(path)?,
            None => TomlConfig::default(),
        };

        let config = Self::from_sources(|key| std::env::var(key).ok(), toml_config)?;
        info!(
            crawl_base_url = %config.crawl.base_url,
            classifier_url = %config.classifier.url,
            threshold = config.classifier.threshold,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Resolve configuration from an environment lookup and a parsed TOML file.
    pub fn from_sources<F>(env: F, toml: TomlConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolver = Resolver { env };

        let token = resolver
            .string("KAYPOH_CRAWL_TOKEN", toml.crawl_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "Crawl service token not configured. Set KAYPOH_CRAWL_TOKEN \
                     or crawl_token in the TOML config file."
                        .to_string(),
                )
            })?;

        let crawl = CrawlSettings {
            token,
            base_url: trim_url(resolver.string_or(
                "KAYPOH_CRAWL_BASE_URL",
                toml.crawl_base_url,
                DEFAULT_CRAWL_BASE_URL,
            )),
            actor_id: resolver.string_or(
                "KAYPOH_CRAWL_ACTOR_ID",
                toml.crawl_actor_id,
                DEFAULT_CRAWL_ACTOR_ID,
            ),
            default_location: resolver.string_or(
                "KAYPOH_DEFAULT_LOCATION",
                toml.default_location,
                DEFAULT_LOCATION,
            ),
            local_location: resolver.string_or(
                "KAYPOH_LOCAL_LOCATION",
                toml.local_location,
                DEFAULT_LOCAL_LOCATION,
            ),
            max_wait: Duration::from_secs(resolver.parse(
                "KAYPOH_CRAWL_MAX_WAIT_SECS",
                toml.crawl_max_wait_secs,
                300,
            )?),
            poll_interval: Duration::from_secs(resolver.parse(
                "KAYPOH_CRAWL_POLL_INTERVAL_SECS",
                toml.crawl_poll_interval_secs,
                5,
            )?),
        };

        let threshold = resolver.parse("KAYPOH_THRESHOLD", toml.threshold, DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "Classification threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        let max_retries = resolver.parse(
            "KAYPOH_CLASSIFIER_MAX_RETRIES",
            toml.classifier_max_retries,
            3u32,
        )?;
        if max_retries == 0 {
            return Err(Error::Config(
                "KAYPOH_CLASSIFIER_MAX_RETRIES must be at least 1".to_string(),
            ));
        }

        let classifier = ClassifierSettings {
            url: trim_url(resolver.string_or(
                "KAYPOH_CLASSIFIER_URL",
                toml.classifier_url,
                DEFAULT_CLASSIFIER_URL,
            )),
            threshold,
            max_retries,
            submit_timeout: Duration::from_secs(resolver.parse(
                "KAYPOH_CLASSIFIER_SUBMIT_TIMEOUT_SECS",
                toml.classifier_submit_timeout_secs,
                60,
            )?),
            poll_timeout: Duration::from_secs(resolver.parse(
                "KAYPOH_CLASSIFIER_POLL_TIMEOUT_SECS",
                toml.classifier_poll_timeout_secs,
                120,
            )?),
        };

        let server = ServerSettings {
            host: resolver.string_or("KAYPOH_HOST", toml.host, "127.0.0.1"),
            port: resolver.parse("KAYPOH_PORT", toml.port, 3000u16)?,
            static_dir: resolver
                .string("KAYPOH_STATIC_DIR", None)
                .map(PathBuf::from)
                .or(toml.static_dir),
        };

        Ok(Self {
            crawl,
            classifier,
            server,
        })
    }
}

struct Resolver<F> {
    env: F,
}

impl<F> Resolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, toml_value: Option<String>) -> Option<String> {
        (self.env)(key).or(toml_value)
    }

    fn string_or(&self, key: &str, toml_value: Option<String>, default: &str) -> String {
        self.string(key, toml_value)
            .unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, toml_value: Option<T>, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.env)(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {}={:?}: {}", key, raw, e))),
            None => Ok(toml_value.unwrap_or(default)),
        }
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Locate the TOML config file, if any
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KAYPOH_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let path = dirs::config_dir().map(|d| d.join("kaypoh").join("config.toml"));
    if path.is_none() {
        warn!("Could not determine config directory, skipping TOML config");
    }
    path
}
