//! Client configuration
//!
//! A [`ClientConfig`] can be loaded from YAML, read from the environment,
//! or assembled in code:
//!
//! ```yaml
//! billomat_id: acme
//! api_key: 0123456789abcdef
//! timeout_secs: 30
//! rate_limit:
//!   requests_per_second: 5
//! pagination:
//!   per_page: 500
//!   max_in_flight: 8
//!   batch_policy: log_and_skip
//! ```

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::pagination::{BatchOptions, DEFAULT_PER_PAGE};
use crate::types::{BackoffType, FailurePolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the account id
pub const ENV_BILLOMAT_ID: &str = "BILLOMAT_ID";
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "BILLOMAT_API_KEY";
/// Environment variable holding the app id
pub const ENV_APP_ID: &str = "BILLOMAT_APP_ID";
/// Environment variable holding the app secret
pub const ENV_APP_SECRET: &str = "BILLOMAT_APP_SECRET";
/// Environment variable overriding the API base URL
pub const ENV_BASE_URL: &str = "BILLOMAT_BASE_URL";

// ============================================================================
// Top-Level Client Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account id, the subdomain in `https://{id}.billomat.net`
    pub billomat_id: String,

    /// Account API key
    pub api_key: String,

    /// App id for registered apps
    #[serde(default)]
    pub app_id: Option<String>,

    /// App secret for registered apps
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Overrides the API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff
    #[serde(default)]
    pub backoff: BackoffSettings,

    /// Client-side throttling
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Collection retrieval
    #[serde(default)]
    pub pagination: PaginationSettings,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffSettings {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Whether outgoing requests are throttled at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests per second limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Burst size
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_rps() -> u32 {
    10
}

fn default_burst() -> u32 {
    10
}

/// Pagination and batch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSettings {
    /// Page size for sequential and full-range retrieval
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Page size for child batches keyed by parent id
    #[serde(default = "default_per_page")]
    pub batch_per_page: u32,

    /// Upper bound on concurrent batch requests; unbounded when absent
    #[serde(default)]
    pub max_in_flight: Option<usize>,

    /// Per-request timeout for batch members
    #[serde(default)]
    pub batch_timeout_secs: Option<u64>,

    /// Failure handling for sequential retrieval
    #[serde(default)]
    pub sequential_policy: FailurePolicy,

    /// Failure handling for concurrent batches
    #[serde(default = "default_batch_policy")]
    pub batch_policy: FailurePolicy,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            batch_per_page: default_per_page(),
            max_in_flight: None,
            batch_timeout_secs: None,
            sequential_policy: FailurePolicy::FailFast,
            batch_policy: default_batch_policy(),
        }
    }
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_batch_policy() -> FailurePolicy {
    FailurePolicy::LogAndSkip
}

impl PaginationSettings {
    /// Options for a [`BatchCollector`](crate::pagination::BatchCollector)
    pub fn batch_options(&self) -> BatchOptions {
        let mut options = BatchOptions::new().policy(self.batch_policy);
        if let Some(limit) = self.max_in_flight {
            options = options.max_in_flight(limit);
        }
        if let Some(secs) = self.batch_timeout_secs {
            options = options.request_timeout(Duration::from_secs(secs));
        }
        options
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ClientConfig {
    /// Create a config with defaults for everything but the credentials
    pub fn new(billomat_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            billomat_id: billomat_id.into(),
            api_key: api_key.into(),
            app_id: None,
            app_secret: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff: BackoffSettings::default(),
            rate_limit: RateLimitSettings::default(),
            pagination: PaginationSettings::default(),
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Build from `BILLOMAT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let billomat_id = get(ENV_BILLOMAT_ID).ok_or_else(|| Error::missing_field(ENV_BILLOMAT_ID))?;
        let api_key = get(ENV_API_KEY).ok_or_else(|| Error::missing_field(ENV_API_KEY))?;

        let mut config = Self::new(billomat_id, api_key);
        config.app_id = get(ENV_APP_ID);
        config.app_secret = get(ENV_APP_SECRET);
        config.base_url = get(ENV_BASE_URL);
        config.validate()?;
        Ok(config)
    }

    /// Set app credentials
    #[must_use]
    pub fn with_app(mut self, app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Replace the pagination settings
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationSettings) -> Self {
        self.pagination = pagination;
        self
    }

    /// Turn client-side throttling off
    #[must_use]
    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limit.enabled = false;
        self
    }

    /// Set max retries
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Check the configuration for obvious mistakes
    pub fn validate(&self) -> Result<()> {
        if self.billomat_id.trim().is_empty() {
            return Err(Error::missing_field("billomat_id"));
        }
        self.credentials().validate()?;

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be greater than 0"));
        }
        if self.pagination.per_page == 0 {
            return Err(Error::invalid_value("pagination.per_page", "must be greater than 0"));
        }
        if self.pagination.batch_per_page == 0 {
            return Err(Error::invalid_value(
                "pagination.batch_per_page",
                "must be greater than 0",
            ));
        }
        if self.pagination.max_in_flight == Some(0) {
            return Err(Error::invalid_value(
                "pagination.max_in_flight",
                "must be greater than 0",
            ));
        }

        let url = url::Url::parse(&self.api_url())?;
        if url.cannot_be_a_base() {
            return Err(Error::invalid_value("base_url", "not a base URL"));
        }
        Ok(())
    }

    /// The API root, e.g. `https://acme.billomat.net/api/`
    pub fn api_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => format!("https://{}.billomat.net/api/", self.billomat_id.trim()),
        }
    }

    /// Credentials for request headers
    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
        }
    }

    /// Transport settings for the HTTP client
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.api_url())
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff.backoff_type,
                Duration::from_millis(self.backoff.initial_ms),
                Duration::from_millis(self.backoff.max_ms),
            );

        builder = if self.rate_limit.enabled {
            builder.rate_limit(RateLimiterConfig::new(
                self.rate_limit.requests_per_second,
                self.rate_limit.burst_size,
            ))
        } else {
            builder.no_rate_limit()
        };

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = ClientConfig::from_yaml_str("billomat_id: acme\napi_key: k\n").unwrap();

        assert_eq!(config, ClientConfig::new("acme", "k"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.pagination.per_page, 1000);
        assert_eq!(config.pagination.batch_per_page, 1000);
        assert_eq!(config.pagination.sequential_policy, FailurePolicy::FailFast);
        assert_eq!(config.pagination.batch_policy, FailurePolicy::LogAndSkip);
        assert!(config.rate_limit.enabled);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r"
billomat_id: acme
api_key: k
app_id: app
app_secret: secret
base_url: http://localhost:8080/api/
timeout_secs: 5
max_retries: 1
backoff:
  type: linear
  initial_ms: 10
  max_ms: 100
rate_limit:
  enabled: false
pagination:
  per_page: 250
  batch_per_page: 50
  max_in_flight: 4
  batch_timeout_secs: 20
  sequential_policy: log_and_skip
  batch_policy: fail_fast
";
        let config = ClientConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.app_id.as_deref(), Some("app"));
        assert_eq!(config.api_url(), "http://localhost:8080/api/");
        assert_eq!(config.backoff.backoff_type, BackoffType::Linear);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.pagination.per_page, 250);
        assert_eq!(config.pagination.max_in_flight, Some(4));
        assert_eq!(config.pagination.sequential_policy, FailurePolicy::LogAndSkip);
        assert_eq!(config.pagination.batch_policy, FailurePolicy::FailFast);

        let http = config.http_config();
        assert_eq!(http.timeout, Duration::from_secs(5));
        assert_eq!(http.max_retries, 1);
        assert_eq!(http.initial_backoff, Duration::from_millis(10));
        assert!(http.rate_limit.is_none());
    }

    #[test]
    fn test_api_url_from_id() {
        let config = ClientConfig::new("acme", "k");
        assert_eq!(config.api_url(), "https://acme.billomat.net/api/");
        assert_eq!(
            config.http_config().base_url.as_deref(),
            Some("https://acme.billomat.net/api/")
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            ClientConfig::new("", "k").validate(),
            Err(Error::MissingConfigField { .. })
        ));
        assert!(matches!(
            ClientConfig::new("acme", " ").validate(),
            Err(Error::MissingConfigField { .. })
        ));

        let mut config = ClientConfig::new("acme", "k");
        config.pagination.per_page = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));

        let mut config = ClientConfig::new("acme", "k");
        config.pagination.max_in_flight = Some(0);
        assert!(config.validate().is_err());

        let config = ClientConfig::new("acme", "k").with_base_url("not a url");
        assert!(matches!(config.validate(), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_missing_required_field_is_yaml_error() {
        let err = ClientConfig::from_yaml_str("billomat_id: acme\n").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "billomat_id: acme\napi_key: k\npagination:\n  per_page: 10").unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pagination.per_page, 10);
    }

    #[test]
    fn test_from_file_missing() {
        let err = ClientConfig::from_file("/nonexistent/billomat.yaml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_BILLOMAT_ID, "acme"),
            (ENV_API_KEY, "k"),
            (ENV_APP_ID, "app"),
            (ENV_APP_SECRET, "secret"),
            (ENV_BASE_URL, ""),
        ]);
        let config =
            ClientConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();

        assert_eq!(config.billomat_id, "acme");
        assert_eq!(config.app_secret.as_deref(), Some("secret"));
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let err = ClientConfig::from_lookup(|key| {
            (key == ENV_BILLOMAT_ID).then(|| "acme".to_string())
        })
        .unwrap_err();

        match err {
            Error::MissingConfigField { field } => assert_eq!(field, ENV_API_KEY),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_batch_options() {
        let mut settings = PaginationSettings::default();
        let options = settings.batch_options();
        assert_eq!(options.policy, FailurePolicy::LogAndSkip);
        assert_eq!(options.max_in_flight, None);
        assert_eq!(options.request_timeout, None);

        settings.max_in_flight = Some(3);
        settings.batch_timeout_secs = Some(2);
        let options = settings.batch_options();
        assert_eq!(options.max_in_flight, Some(3));
        assert_eq!(options.request_timeout, Some(Duration::from_secs(2)));
    }
}
