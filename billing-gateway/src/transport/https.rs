//! HTTPS channel.
//!
//! Form-encoded POST to the gateway using reqwest with rustls. Server
//! certificates are always validated and plain `http://` is refused by the client
//! itself.

use std::path::Path;

use reqwest::{Certificate, Client};
use tracing::{debug, instrument};
use url::Url;

use super::{
    ChannelKind,
    config::{EndpointConfig, HttpConfig},
};
use crate::{
    error::{GatewayError, Result},
    params::WireFields,
    transport::{Channel, sealed},
};

/// HTTPS fallback channel.
///
/// Transactional calls go to the `trans_path`, vault queries to the
/// `query_path`, both on the same host and port.
#[derive(Debug, Clone)]
pub struct HttpsChannel {
    client: Client,
    trans_url: Url,
    query_url: Url,
}

impl sealed::private::Sealed for HttpsChannel {}

impl HttpsChannel {
    /// Creates the channel.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an invalid endpoint or HTTP settings
    /// or an unreadable CA certificate, and [`GatewayError::Http`] if the HTTP
    /// client cannot be built.
    pub fn new(endpoint: &EndpointConfig, http: &HttpConfig) -> Result<Self> {
        endpoint.validate()?;
        http.validate()?;

        let mut builder = Client::builder()
            .https_only(true)
            .use_rustls_tls()
            .pool_max_idle_per_host(http.pool_max_idle_per_host)
            .timeout(http.timeout())
            .connect_timeout(http.connect_timeout());
        if let Some(path) = &http.ca_certificate {
            builder = builder.add_root_certificate(load_certificate(path)?);
        }
        let client = builder.build().map_err(GatewayError::Http)?;

        Ok(Self {
            client,
            trans_url: endpoint.url_for(&endpoint.trans_path)?,
            query_url: endpoint.url_for(&endpoint.query_path)?,
        })
    }

    /// URL used for transactional calls.
    #[must_use]
    pub const fn trans_url(&self) -> &Url {
        &self.trans_url
    }

    /// URL used for vault queries.
    #[must_use]
    pub const fn query_url(&self) -> &Url {
        &self.query_url
    }

    /// Sends a vault query and returns the response body verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] on connection failure and
    /// [`GatewayError::UnexpectedStatus`] on a non-2xx answer.
    pub async fn query(&self, fields: &WireFields) -> Result<String> {
        self.post_form(&self.query_url, fields).await
    }

    #[instrument(skip(self, url, fields), fields(path = url.path(), field_count = fields.len()))]
    async fn post_form(&self, url: &Url, fields: &WireFields) -> Result<String> {
        let response = self.client.post(url.clone()).form(fields).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UnexpectedStatus { status: status.as_u16() });
        }

        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "gateway responded");
        Ok(body)
    }
}

impl Channel for HttpsChannel {
    async fn send<'a>(&'a self, fields: &'a WireFields) -> Result<WireFields> {
        let body = self.post_form(&self.trans_url, fields).await?;
        let pairs = parse_response_body(&body);
        if pairs.is_empty() {
            return Err(GatewayError::UnexpectedResponse(
                "empty transaction response body".to_owned(),
            ));
        }
        Ok(pairs.into_iter().collect())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Https
    }
}

fn load_certificate(path: &Path) -> Result<Certificate> {
    let pem = std::fs::read(path).map_err(|e| {
        GatewayError::Config(format!("cannot read CA certificate {}: {e}", path.display()))
    })?;
    Certificate::from_pem(&pem).map_err(|e| {
        GatewayError::Config(format!("invalid CA certificate {}: {e}", path.display()))
    })
}

/// Parses a newline-delimited `key=value` response body.
///
/// The value is everything after the first `=`. Blank lines are skipped and a
/// line without `=` yields the key with an empty value. Pairs are returned in
/// body order, duplicates included.
///
/// # Examples
///
/// ```
/// use billing_gateway::transport::parse_response_body;
///
/// let pairs = parse_response_body("transid=025-0000083216\nstatus=approved\n");
/// assert_eq!(pairs[1], ("status".to_owned(), "approved".to_owned()));
/// ```
#[must_use]
pub fn parse_response_body(body: &str) -> Vec<(String, String)> {
    body.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.trim().to_owned(), value.to_owned()),
            None => (line.trim().to_owned(), String::new()),
        })
        .collect()
}
