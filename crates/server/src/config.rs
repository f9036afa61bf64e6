//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WOOCOMMERCE_URL` - Store base URL (e.g., <https://shop.example.com>)
//! - `WOOCOMMERCE_CONSUMER_KEY` - REST API consumer key
//! - `WOOCOMMERCE_CONSUMER_SECRET` - REST API consumer secret
//!
//! ## Optional
//! - `CATALOG_HOST` - Bind address (default: 127.0.0.1)
//! - `CATALOG_PORT` - Listen port (default: 3000)
//! - `WOOCOMMERCE_API_VERSION` - REST API version (default: v3)
//! - `WOOCOMMERCE_TIMEOUT_SECS` - Per-request upstream timeout (default: 30)
//! - `CATALOG_CACHE_TTL_SECS` - Cache entry time-to-live (default: 300)
//! - `CATALOG_REFRESH_INTERVAL_SECS` - Background resync interval (default: 300)
//! - `CATALOG_STALE_RETENTION_SECS` - How long expired entries are kept as a
//!   fallback for failed refreshes (default: 3600)
//! - `CATALOG_MAX_CONCURRENCY` - Concurrent upstream requests per drain (default: 8)
//! - `CATALOG_PAGE_SIZE` - Products per query page (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_VERSION: &str = "v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
const DEFAULT_STALE_RETENTION_SECS: u64 = 3600;
const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_PAGE_SIZE: usize = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Catalog proxy configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Upstream store configuration
    pub woocommerce: WooCommerceConfig,
    /// Cache and refresh tuning
    pub cache: CacheConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// WooCommerce REST API configuration.
///
/// Implements `Debug` manually to redact the consumer secret.
#[derive(Clone)]
pub struct WooCommerceConfig {
    /// Store base URL
    pub base_url: Url,
    /// REST API version segment (`v3` in `wp-json/wc/v3`)
    pub api_version: String,
    /// Consumer key (sent as the basic-auth user)
    pub consumer_key: String,
    /// Consumer secret (sent as the basic-auth password)
    pub consumer_secret: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for WooCommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooCommerceConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Cache store and refresh tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries older than this are recomputed
    pub ttl: Duration,
    /// Interval between background full resyncs
    pub refresh_interval: Duration,
    /// Expired entries are retained this long as a fallback
    pub stale_retention: Duration,
    /// Concurrent upstream requests while draining a listing
    pub max_concurrency: usize,
    /// Products per query page
    pub page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            stale_retention: Duration::from_secs(DEFAULT_STALE_RETENTION_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the consumer secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("CATALOG_HOST", "127.0.0.1".parse::<IpAddr>().ok())?;
        let port = parse_env("CATALOG_PORT", Some(3000_u16))?;

        Ok(Self {
            host,
            port,
            woocommerce: WooCommerceConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl WooCommerceConfig {
    /// Configuration with default version and timeout.
    #[must_use]
    pub fn new(base_url: Url, consumer_key: impl Into<String>, consumer_secret: SecretString) -> Self {
        Self {
            base_url,
            api_version: DEFAULT_API_VERSION.to_string(),
            consumer_key: consumer_key.into(),
            consumer_secret,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("WOOCOMMERCE_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("WOOCOMMERCE_URL".to_string(), e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "WOOCOMMERCE_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let consumer_secret = get_required_env("WOOCOMMERCE_CONSUMER_SECRET")?;
        reject_placeholder(&consumer_secret, "WOOCOMMERCE_CONSUMER_SECRET")?;

        let timeout_secs = parse_env("WOOCOMMERCE_TIMEOUT_SECS", Some(DEFAULT_TIMEOUT_SECS))?;
        require_non_zero(timeout_secs, "WOOCOMMERCE_TIMEOUT_SECS")?;

        Ok(Self {
            base_url,
            api_version: get_env_or_default("WOOCOMMERCE_API_VERSION", DEFAULT_API_VERSION),
            consumer_key: get_required_env("WOOCOMMERCE_CONSUMER_KEY")?,
            consumer_secret: SecretString::from(consumer_secret),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Versioned REST root, always ending in a slash
    /// (e.g. `https://shop.example.com/wp-json/wc/v3/`).
    #[must_use]
    pub fn api_root(&self) -> String {
        format!(
            "{}/wp-json/wc/{}/",
            self.base_url.as_str().trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

impl CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            ttl: Duration::from_secs(parse_env("CATALOG_CACHE_TTL_SECS", Some(DEFAULT_TTL_SECS))?),
            refresh_interval: Duration::from_secs(parse_env(
                "CATALOG_REFRESH_INTERVAL_SECS",
                Some(DEFAULT_REFRESH_INTERVAL_SECS),
            )?),
            stale_retention: Duration::from_secs(parse_env(
                "CATALOG_STALE_RETENTION_SECS",
                Some(DEFAULT_STALE_RETENTION_SECS),
            )?),
            max_concurrency: parse_env("CATALOG_MAX_CONCURRENCY", Some(DEFAULT_MAX_CONCURRENCY))?,
            page_size: parse_env("CATALOG_PAGE_SIZE", Some(DEFAULT_PAGE_SIZE))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the tuning values are usable together.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_zero(self.ttl.as_secs(), "CATALOG_CACHE_TTL_SECS")?;
        require_non_zero(self.refresh_interval.as_secs(), "CATALOG_REFRESH_INTERVAL_SECS")?;
        require_non_zero(self.max_concurrency as u64, "CATALOG_MAX_CONCURRENCY")?;
        require_non_zero(self.page_size as u64, "CATALOG_PAGE_SIZE")?;
        if self.stale_retention < self.ttl {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_STALE_RETENTION_SECS".to_string(),
                format!(
                    "must not be shorter than the cache TTL ({}s)",
                    self.ttl.as_secs()
                ),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => default.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn require_non_zero(value: u64, key: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Reject secrets that are obviously copied from a template.
fn reject_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }
    Ok(())
}
