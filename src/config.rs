//! Crawler configuration
//!
//! Settings consumed by the crawl, loadable from YAML. Every field has a
//! default, so an empty document is a valid configuration:
//!
//! ```yaml
//! api_url: https://api.github.com
//! token: ghp_xxx
//! max_retries: 3
//! backoff_factor: 0.5
//! ```

use crate::error::{Error, Result};
use crate::http::{RateLimiterConfig, TransportConfig};
use crate::types::OptionStringExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Media type requested from the API
pub const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// Public GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Configuration for an organization crawl
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Root of the REST API
    pub api_url: String,

    /// API token sent as `Authorization: token <T>`
    pub token: Option<String>,

    /// Retries after the first attempt on transient failures
    pub max_retries: u32,

    /// Backoff factor in seconds
    pub backoff_factor: f64,

    /// Upper bound on a single backoff delay
    pub max_backoff_secs: u64,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Remaining quota below which requests are paced
    pub low_water_mark: i64,

    /// Rate limit wait when the server gives no hint
    pub default_wait_secs: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            max_retries: 3,
            backoff_factor: 0.5,
            max_backoff_secs: 120,
            timeout_secs: 30,
            low_water_mark: 10,
            default_wait_secs: 60,
            user_agent: format!("org-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl std::fmt::Debug for CrawlerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlerConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("max_retries", &self.max_retries)
            .field("backoff_factor", &self.backoff_factor)
            .field("max_backoff_secs", &self.max_backoff_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("low_water_mark", &self.low_water_mark)
            .field("default_wait_secs", &self.default_wait_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl CrawlerConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Set the token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the API root
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Check values that would otherwise fail later
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| Error::invalid_value("api_url", e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(Error::invalid_value("api_url", "must be a hierarchical URL"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(Error::invalid_value(
                "backoff_factor",
                "must be a non-negative number",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Token, if one is set and not blank
    pub fn token(&self) -> Option<String> {
        self.token.clone().none_if_empty()
    }

    /// URL of the organization's repository collection
    pub fn org_repos_url(&self, org: &str) -> Result<String> {
        let org = org.trim();
        if org.is_empty() {
            return Err(Error::invalid_value("org", "organization name is empty"));
        }

        let mut url = Url::parse(&self.api_url)?;
        url.path_segments_mut()
            .map_err(|()| Error::invalid_value("api_url", "must be a hierarchical URL"))?
            .pop_if_empty()
            .extend(["orgs", org, "repos"]);
        Ok(url.to_string())
    }

    /// Transport settings, including the `Accept` and `Authorization` headers
    pub fn transport_config(&self) -> TransportConfig {
        let mut builder = TransportConfig::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff_factor,
                Duration::from_secs(self.max_backoff_secs),
            )
            .user_agent(&self.user_agent)
            .header("Accept", ACCEPT_HEADER);
        if let Some(token) = self.token() {
            builder = builder.header("Authorization", format!("token {token}"));
        }
        builder.build()
    }

    /// Rate limiter settings
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig::new(
            self.low_water_mark,
            Duration::from_secs(self.default_wait_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CrawlerConfig::default();
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.token, None);
        assert_eq!(config.max_retries, 3);
        assert!((config.backoff_factor - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.low_water_mark, 10);
        assert_eq!(config.default_wait_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial_document() {
        let config = CrawlerConfig::from_yaml_str(
            r"
api_url: https://ghe.example.com/api/v3
token: abc123
max_retries: 5
",
        )
        .unwrap();
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.token(), Some("abc123".to_string()));
        assert_eq!(config.max_retries, 5);
        assert!((config.backoff_factor - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_yaml_empty_document() {
        assert_eq!(
            CrawlerConfig::from_yaml_str("  \n").unwrap(),
            CrawlerConfig::default()
        );
    }

    #[test]
    fn test_from_yaml_rejects_bad_values() {
        let err = CrawlerConfig::from_yaml_str("backoff_factor: -1.0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "backoff_factor"));

        let err = CrawlerConfig::from_yaml_str("api_url: not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "api_url"));

        let err = CrawlerConfig::from_yaml_str("timeout_secs: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "timeout_secs"));

        let err = CrawlerConfig::from_yaml_str("max_retries: lots").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_retries: 7\nlow_water_mark: 50").unwrap();

        let config = CrawlerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.low_water_mark, 50);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CrawlerConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let config = CrawlerConfig::default().with_token("   ");
        assert_eq!(config.token(), None);
        assert!(!config
            .transport_config()
            .default_headers
            .contains_key("Authorization"));
    }

    #[test]
    fn test_transport_config_headers() {
        let config = CrawlerConfig::default().with_token("secret");
        let transport = config.transport_config();
        assert_eq!(
            transport.default_headers.get("Authorization"),
            Some(&"token secret".to_string())
        );
        assert_eq!(
            transport.default_headers.get("Accept"),
            Some(&ACCEPT_HEADER.to_string())
        );
        assert_eq!(transport.max_retries, 3);
        assert_eq!(transport.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_rate_limiter_config() {
        let limiter = CrawlerConfig::default().rate_limiter_config();
        assert_eq!(limiter.low_water_mark, 10);
        assert_eq!(limiter.default_wait, Duration::from_secs(60));
    }

    #[test]
    fn test_org_repos_url() {
        let config = CrawlerConfig::default();
        assert_eq!(
            config.org_repos_url("Azure").unwrap(),
            "https://api.github.com/orgs/Azure/repos"
        );

        let config = config.with_api_url("https://ghe.example.com/api/v3/");
        assert_eq!(
            config.org_repos_url("platform team").unwrap(),
            "https://ghe.example.com/api/v3/orgs/platform%20team/repos"
        );

        assert!(config.org_repos_url("  ").is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = CrawlerConfig::default().with_token("ghp_supersecret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_supersecret"));
        assert!(debug.contains("<redacted>"));
    }
}
