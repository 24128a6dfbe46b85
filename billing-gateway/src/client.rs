//! Gateway client.
//!
//! [`GatewayClient`] turns a logical request into wire fields, picks the
//! password that matches the selected channel, dispatches, and decodes the answer.

use std::{fmt, sync::Arc};

use tokio::sync::RwLock;
use tracing::{Span, debug, field, info, instrument};

use crate::{
    config::{Credentials, GatewayConfig},
    error::{GatewayError, Result},
    export::TabularExport,
    params::{FieldKey, RequestParameters, WireFields, decode, encode},
    result::GatewayResult,
    transport::{ChannelKind, HttpsChannel, NativeLink, PasswordRoute, TransportSelector},
};

/// Transactional action sent in the `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Store a billing profile in the vault.
    Store,
    /// Remove a billing profile from the vault.
    Unstore,
    /// Charge a stored profile.
    Sale,
    /// Refund or credit a stored profile.
    Credit,
}

impl RequestKind {
    /// Wire token for the `action` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Unstore => "unstore",
            Self::Sale => "sale",
            Self::Credit => "credit",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for the billing gateway.
///
/// Transactional calls go through the [`TransportSelector`]; vault queries
/// always use the HTTPS query path.
///
/// # Examples
///
/// ```rust,no_run
/// use billing_gateway::{GatewayClient, GatewayConfig, RequestKind, params::RequestParameters};
///
/// # async fn example() -> billing_gateway::Result<()> {
/// let client = GatewayClient::new(&GatewayConfig::default())?;
///
/// let params = RequestParameters::new()
///     .with("cc", "4111111111111111")
///     .with("exp", "0412")
///     .with("name", "Jane Doe");
/// let result = client.submit(RequestKind::Store, params).await?;
///
/// if result.is_approved() {
///     println!("billing id: {:?}", result.billing_id());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GatewayClient {
    selector: TransportSelector,
    credentials: RwLock<Credentials>,
    demo: bool,
}

impl GatewayClient {
    /// Creates a client that talks HTTPS only.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`](crate::GatewayError::Config) for invalid
    /// configuration or if the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Creates a client that prefers the given native link when it reports
    /// itself available.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_native_link(config: &GatewayConfig, link: Arc<dyn NativeLink>) -> Result<Self> {
        Self::build(config, Some(link))
    }

    /// Creates a client around a prepared selector.
    #[must_use]
    pub fn with_selector(config: &GatewayConfig, selector: TransportSelector) -> Self {
        Self {
            selector,
            credentials: RwLock::new(config.credentials.clone()),
            demo: !config.is_production(),
        }
    }

    fn build(config: &GatewayConfig, link: Option<Arc<dyn NativeLink>>) -> Result<Self> {
        config.validate()?;
        let https = HttpsChannel::new(&config.endpoint, &config.http)?;
        Ok(Self::with_selector(config, TransportSelector::new(https, link)))
    }

    /// True when requests carry the demo flag.
    #[must_use]
    pub const fn is_demo(&self) -> bool {
        self.demo
    }

    /// Channel used for transactional calls.
    #[must_use]
    pub fn channel_kind(&self) -> ChannelKind {
        self.selector.select().kind()
    }

    /// Replaces the credentials used by subsequent calls.
    pub async fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = credentials;
        info!("gateway credentials replaced");
    }

    /// Sends a transactional request.
    ///
    /// A decline is a successful call: check the returned result's status.
    ///
    /// # Errors
    ///
    /// Returns a transport-class error if the gateway could not be reached or
    /// its answer could not be read. An answer without a `status` field is
    /// [`GatewayError::UnexpectedResponse`].
    #[instrument(skip(self, params), fields(action = %kind, channel = field::Empty))]
    pub async fn submit(
        &self,
        kind: RequestKind,
        params: RequestParameters,
    ) -> Result<GatewayResult> {
        let channel = self.selector.select();
        Span::current().record("channel", channel.kind().as_str());

        let fields = {
            let credentials = self.credentials.read().await;
            prepare_transaction(kind, channel.kind(), &credentials, self.demo, params)
        };

        let response = decode(channel.send(&fields).await?);
        if !response.contains_key(&FieldKey::STATUS) {
            return Err(GatewayError::UnexpectedResponse(format!(
                "gateway response has no status field ({} other fields)",
                response.len()
            )));
        }
        let result = GatewayResult::new(response);
        info!(status = %result.status(), "gateway request completed");
        Ok(result)
    }

    /// Sends a vault query and returns the export body.
    ///
    /// # Errors
    ///
    /// Returns a transport-class error if the query could not be delivered.
    #[instrument(skip(self, params), fields(channel = "https"))]
    pub async fn query(&self, params: RequestParameters) -> Result<TabularExport> {
        let fields = {
            let credentials = self.credentials.read().await;
            prepare_query(&credentials, params)
        };

        let body = self.selector.https().query(&fields).await?;
        let export = TabularExport::new(body);
        debug!(data_lines = export.data_line_count(), "vault query completed");
        Ok(export)
    }
}

/// Wire fields for a transactional call on `channel`.
///
/// Sets `action`, `custid` and the password the channel authenticates with,
/// overwriting caller-supplied values. Adds `demo=y` when `demo` is set.
#[must_use]
pub fn prepare_transaction(
    kind: RequestKind,
    channel: ChannelKind,
    credentials: &Credentials,
    demo: bool,
    params: RequestParameters,
) -> WireFields {
    let password = match channel.transaction_password() {
        PasswordRoute::Operating => credentials.password(),
        PasswordRoute::Vault => credentials.vault_password(),
    };
    let mut params = params
        .with(FieldKey::ACTION, kind.as_str())
        .with(FieldKey::CUSTID, credentials.custid.as_str())
        .with(FieldKey::PASSWORD, password);
    if demo {
        params.insert(FieldKey::DEMO, true);
    }
    encode(&params)
}

/// Wire fields for a vault query; always the vault password.
#[must_use]
pub fn prepare_query(credentials: &Credentials, params: RequestParameters) -> WireFields {
    let params = params
        .with(FieldKey::CUSTID, credentials.custid.as_str())
        .with(FieldKey::PASSWORD, credentials.vault_password());
    encode(&params)
}
