//! Configuration structures for FDM clients.
//!
//! [`FdmConfig`] describes where the appliance lives and how to talk to it.
//! It is validated on construction and serializable so that callers can keep
//! it in a file next to their playbooks.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Path prefix of the versioned FDM REST API.
pub const DEFAULT_API_PREFIX: &str = "/api/fdm/v2";

/// Token endpoint, relative to the API prefix.
pub const DEFAULT_TOKEN_PATH: &str = "/fdm/token";

/// Connection settings for one appliance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FdmConfig {
    /// Appliance base URL, e.g. `https://127.0.0.1:8585`
    #[validate(url)]
    pub hostname: String,

    /// Prefix inserted between the hostname and every resource path
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Token endpoint path, relative to the API prefix
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to custom CA certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl FdmConfig {
    /// Create a new configuration for the given appliance.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname is not a valid URL.
    pub fn new(hostname: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            hostname: hostname.into(),
            api_prefix: default_api_prefix(),
            token_path: default_token_path(),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            request_timeout_secs: default_request_timeout_secs(),
        };

        config.validated()
    }

    /// Re-check the settings after `with_*` changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an invalid hostname or a timeout
    /// outside 1..=300 seconds.
    pub fn validated(self) -> Result<Self, Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        Ok(self)
    }

    /// Set the API prefix.
    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the token endpoint path.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL every resource path is appended to: hostname plus API prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined URL cannot be parsed.
    pub fn api_base_url(&self) -> Result<Url, Error> {
        let base = format!(
            "{}/{}",
            self.hostname.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        );
        Url::parse(base.trim_end_matches('/'))
            .map_err(|e| Error::ConfigError(format!("Invalid hostname: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdm_config_new() {
        let config = FdmConfig::new("https://127.0.0.1:8585").unwrap();
        assert_eq!(config.hostname, "https://127.0.0.1:8585");
        assert_eq!(config.api_prefix, DEFAULT_API_PREFIX);
        assert_eq!(config.token_path, DEFAULT_TOKEN_PATH);
        assert!(config.tls_verify);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_fdm_config_invalid_url() {
        let result = FdmConfig::new("not-a-url");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_fdm_config_builder() {
        let config = FdmConfig::new("https://ftd.example.com")
            .unwrap()
            .with_api_prefix("/api/fdm/latest")
            .with_tls_verify(false)
            .with_timeout(60);

        assert_eq!(config.api_prefix, "/api/fdm/latest");
        assert!(!config.tls_verify);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_api_base_url_joins_prefix() {
        let config = FdmConfig::new("https://ftd.example.com:8585/").unwrap();
        let url = config.api_base_url().unwrap();
        assert_eq!(url.as_str(), "https://ftd.example.com:8585/api/fdm/v2");
    }

    #[test]
    fn test_api_base_url_empty_prefix() {
        let config = FdmConfig::new("http://localhost:9000")
            .unwrap()
            .with_api_prefix("");
        let url = config.api_base_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/");
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: FdmConfig =
            serde_json::from_str(r#"{"hostname": "https://ftd.example.com"}"#).unwrap();
        assert_eq!(config.api_prefix, DEFAULT_API_PREFIX);
        assert!(config.tls_verify);
        assert!(config.tls_ca_cert.is_none());
    }

    #[test]
    fn test_config_validation_timeout_range() {
        let mut config = FdmConfig::new("https://ftd.example.com").unwrap();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 301;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validated_rejects_out_of_range_override() {
        let result = FdmConfig::new("https://ftd.example.com")
            .unwrap()
            .with_timeout(0)
            .validated();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
