//! Gateway configuration.
//!
//! Configuration is an explicit value handed to [`GatewayClient`](crate::GatewayClient);
//! nothing is read from process-global state after construction.
//!
//! # Examples
//!
//! ```
//! use billing_gateway::GatewayConfig;
//!
//! let toml = r#"
//!     environment = "production"
//!
//!     [credentials]
//!     custid = "123456"
//!     password = "topsecret"
//!     vault_password = "supersecure"
//! "#;
//!
//! let config = GatewayConfig::from_toml(toml).unwrap();
//! assert!(config.is_production());
//! assert_eq!(config.credentials.vault_password(), "supersecure");
//! ```

use std::{fmt, path::Path};

use serde::Deserialize;
use zeroize::Zeroize;

use crate::{
    error::{GatewayError, Result},
    transport::{EndpointConfig, HttpConfig},
};

/// Environment variable overriding the customer id.
pub const ENV_CUSTID: &str = "BILLING_CUSTID";
/// Environment variable overriding the operating password.
pub const ENV_PASSWORD: &str = "BILLING_PASSWORD";
/// Environment variable overriding the vault password.
pub const ENV_VAULT_PASSWORD: &str = "BILLING_VAULT_PASSWORD";
/// Environment variable overriding the deployment environment name.
pub const ENV_ENVIRONMENT: &str = "BILLING_ENV";

/// Gateway credentials.
///
/// The operating password authenticates transactional calls over the native
/// channel. The vault password authenticates vault queries and every HTTPS call;
/// the gateway forces it to rotate periodically, so it is replaced through
/// [`GatewayClient::set_credentials`](crate::GatewayClient::set_credentials)
/// rather than tracked here.
///
/// Passwords are zeroized on drop and never printed by `Debug`.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Merchant customer id.
    pub custid: String,
    password: String,
    #[serde(default)]
    vault_password: Option<String>,
}

impl Credentials {
    /// Creates credentials without a separate vault password.
    #[must_use]
    pub fn new(custid: impl Into<String>, password: impl Into<String>) -> Self {
        Self { custid: custid.into(), password: password.into(), vault_password: None }
    }

    /// Sets the vault password.
    #[must_use]
    pub fn with_vault_password(mut self, vault_password: impl Into<String>) -> Self {
        self.vault_password = Some(vault_password.into());
        self
    }

    /// Operating password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Vault password, falling back to the operating password when unset.
    #[must_use]
    pub fn vault_password(&self) -> &str {
        self.vault_password.as_deref().unwrap_or(&self.password)
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("TestMerchant", "password")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("custid", &self.custid)
            .field("password", &"[REDACTED]")
            .field("vault_password", &self.vault_password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.zeroize();
        if let Some(vault_password) = self.vault_password.as_mut() {
            vault_password.zeroize();
        }
    }
}

/// Root gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway credentials.
    #[serde(default)]
    pub credentials: Credentials,

    /// HTTPS endpoint.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Name of the environment this process runs in.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Name of the environment that processes live transactions.
    ///
    /// Every other environment sends `demo=y`.
    #[serde(default = "default_production_environment")]
    pub production_environment: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            endpoint: EndpointConfig::default(),
            http: HttpConfig::default(),
            environment: default_environment(),
            production_environment: default_production_environment(),
        }
    }
}

impl GatewayConfig {
    /// Parses and validates TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails or configuration validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| GatewayError::Config(format!("invalid TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or its contents are invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GatewayError::Config(format!("cannot read config file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Applies `BILLING_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(custid) = lookup(ENV_CUSTID) {
            self.credentials.custid = custid;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.credentials.password.zeroize();
            self.credentials.password = password;
        }
        if let Some(vault_password) = lookup(ENV_VAULT_PASSWORD) {
            if let Some(old) = self.credentials.vault_password.as_mut() {
                old.zeroize();
            }
            self.credentials.vault_password = Some(vault_password);
        }
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            self.environment = environment;
        }
        self
    }

    /// Validates all sections.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an empty customer id, empty environment
    /// names, or invalid endpoint / HTTP settings.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.custid.trim().is_empty() {
            return Err(GatewayError::Config("credentials.custid must not be empty".to_owned()));
        }
        if self.environment.trim().is_empty() || self.production_environment.trim().is_empty() {
            return Err(GatewayError::Config("environment names must not be empty".to_owned()));
        }
        self.endpoint.validate()?;
        self.http.validate()?;
        Ok(())
    }

    /// True when calls should be processed live.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == self.production_environment
    }
}

fn default_environment() -> String {
    "development".to_owned()
}

fn default_production_environment() -> String {
    "production".to_owned()
}
