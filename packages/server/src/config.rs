//! Server settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use disaster_feed_aggregator::aggregator::DEFAULT_SOURCE_TIMEOUT;
use disaster_feed_aggregator::scheduler::DEFAULT_MAP_INTERVAL;
use disaster_feed_geocoder::nominatim::DEFAULT_BASE_URL;
use disaster_feed_risk::scorer::DEFAULT_SEED;
use disaster_feed_source::retry::RetryPolicy;

/// Errors from reading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    Invalid {
        /// Environment variable name.
        key: &'static str,
        /// The raw value.
        value: String,
    },
}

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Time between refresh cycles (`REFRESH_INTERVAL_SECS`).
    pub refresh_interval: Duration,
    /// Upper bound on one source fetch (`SOURCE_TIMEOUT_SECS`).
    pub source_timeout: Duration,
    /// Retries for transient HTTP failures per request (`SOURCE_RETRIES`).
    pub source_retries: u32,
    /// Seed for deterministic risk scoring (`RISK_SEED`).
    pub risk_seed: u64,
    /// Use non-deterministic risk scoring (`RISK_RANDOM`).
    pub risk_random: bool,
    /// Nominatim instance (`NOMINATIM_URL`).
    pub nominatim_url: String,
    /// Comma-separated ISO country codes restricting geocode searches
    /// (`NOMINATIM_COUNTRY_CODES`).
    pub nominatim_country_codes: Option<String>,
    /// Directory of source TOML files replacing the embedded ones
    /// (`DISASTER_FEED_SOURCES_DIR`).
    pub sources_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            refresh_interval: DEFAULT_MAP_INTERVAL,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            source_retries: RetryPolicy::default().max_retries,
            risk_seed: DEFAULT_SEED,
            risk_random: false,
            nominatim_url: DEFAULT_BASE_URL.to_string(),
            nominatim_country_codes: None,
            sources_dir: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            refresh_interval: parse(&lookup, "REFRESH_INTERVAL_SECS")?
                .filter(|&secs: &u64| secs > 0)
                .map_or(defaults.refresh_interval, Duration::from_secs),
            source_timeout: parse(&lookup, "SOURCE_TIMEOUT_SECS")?
                .filter(|&secs: &u64| secs > 0)
                .map_or(defaults.source_timeout, Duration::from_secs),
            source_retries: parse(&lookup, "SOURCE_RETRIES")?.unwrap_or(defaults.source_retries),
            risk_seed: parse(&lookup, "RISK_SEED")?.unwrap_or(defaults.risk_seed),
            risk_random: parse_flag(&lookup, "RISK_RANDOM")?.unwrap_or(defaults.risk_random),
            nominatim_url: get("NOMINATIM_URL").unwrap_or(defaults.nominatim_url),
            nominatim_country_codes: get("NOMINATIM_COUNTRY_CODES"),
            sources_dir: get("DISASTER_FEED_SOURCES_DIR").map(PathBuf::from),
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(None),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match lookup(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid { key, value }),
        },
        None => Ok(None),
    }
}
