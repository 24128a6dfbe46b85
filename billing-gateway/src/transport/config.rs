//! Transport configuration types.
//!
//! TOML-deserializable settings for the HTTPS channel: where the gateway lives
//! and how patient the HTTP client is.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::error::{GatewayError, Result};

/// Gateway endpoint for the HTTPS channel.
///
/// The defaults are the gateway contract constants. Override them to point at a
/// staging or local test gateway.
///
/// # Examples
///
/// ```toml
/// [endpoint]
/// host = "vault.staging.example.com"
/// trans_path = "/trans/"
/// query_path = "/query/"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Gateway host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// TLS port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path for transactional calls (store, unstore, sale, credit).
    #[serde(default = "default_trans_path")]
    pub trans_path: String,

    /// Path for vault queries.
    #[serde(default = "default_query_path")]
    pub query_path: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trans_path: default_trans_path(),
            query_path: default_query_path(),
        }
    }
}

impl EndpointConfig {
    /// Validates host and paths.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the host is empty, the port is 0, or
    /// either path does not start with `/` or contains traversal sequences.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(GatewayError::Config("endpoint host must not be empty".to_owned()));
        }
        if self.port == 0 {
            return Err(GatewayError::Config("endpoint port must not be 0".to_owned()));
        }
        validate_path("trans_path", &self.trans_path)?;
        validate_path("query_path", &self.query_path)?;
        Ok(())
    }

    /// Builds the HTTPS URL for a path.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the resulting URL does not parse.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let raw = format!("https://{}:{}{path}", self.host, self.port);
        Url::parse(&raw).map_err(|e| GatewayError::Config(format!("invalid endpoint '{raw}': {e}")))
    }
}

fn validate_path(name: &str, path: &str) -> Result<()> {
    if path.contains("..") || path.contains("//") {
        return Err(GatewayError::Config(format!(
            "endpoint {name} contains a traversal sequence: {path}"
        )));
    }
    if !path.starts_with('/') {
        return Err(GatewayError::Config(format!("endpoint {name} must start with '/': {path}")));
    }
    Ok(())
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Maximum idle connections per host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// PEM file with an extra root certificate to trust, for gateways signed
    /// by a private CA. The public roots stay trusted and validation stays on.
    #[serde(default)]
    pub ca_certificate: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: default_pool_max_idle(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            ca_certificate: None,
        }
    }
}

impl HttpConfig {
    /// Validates configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns error if timeout values are outside valid ranges:
    /// - `timeout_secs`: must be 1-300 seconds
    /// - `connect_timeout_secs`: must be 1-60 seconds
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(GatewayError::Config("timeout_secs must be between 1 and 300".to_owned()));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 60 {
            return Err(GatewayError::Config(
                "connect_timeout_secs must be between 1 and 60".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_host() -> String {
    "vault.trustcommerce.com".to_owned()
}

const fn default_port() -> u16 {
    443
}

fn default_trans_path() -> String {
    "/trans/".to_owned()
}

fn default_query_path() -> String {
    "/query/".to_owned()
}

const fn default_pool_max_idle() -> usize {
    10
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_connect_timeout_secs() -> u64 {
    10
}
