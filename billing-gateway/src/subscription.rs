//! Subscription lifecycle operations.
//!
//! Each operation merges its action and identifying fields into the caller's
//! parameters and goes through [`GatewayClient::submit`]. The gateway decides
//! validity; nothing here checks required fields.
//!
//! # Examples
//!
//! ```rust,no_run
//! use billing_gateway::{
//!     GatewayClient, GatewayConfig,
//!     subscription::{self, NewSubscription},
//! };
//!
//! # async fn example() -> billing_gateway::Result<()> {
//! let client = GatewayClient::new(&GatewayConfig::default())?;
//!
//! // Bill Jennifer $12.00 monthly
//! let result = subscription::create(
//!     &client,
//!     NewSubscription::new("4111111111111111", "0412", 1200, "1m").with_name("Jennifer Smith"),
//! )
//! .await?;
//!
//! match result.billing_id() {
//!     Some(id) if result.is_approved() => println!("subscription created: {id}"),
//!     _ => println!("store failed: {:?}", result.error_message()),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;

use zeroize::Zeroize;

use crate::{
    client::{GatewayClient, RequestKind},
    error::Result,
    export::TabularExport,
    params::{FieldKey, RequestParameters},
    result::GatewayResult,
    sync::{BillingId, QUERY_TYPE_TRANSACTION, TransactionSource},
};

/// Card and schedule for a new subscription.
///
/// The card number is zeroized on drop and never printed by `Debug`.
#[derive(Clone)]
pub struct NewSubscription {
    card_number: String,
    /// Expiration as `MMYY`.
    pub expiration: String,
    /// Cardholder name.
    pub name: Option<String>,
    /// Recurring amount in minor units.
    pub amount_minor: i64,
    /// Billing cycle such as `1m` or `2w`.
    pub cycle: String,
}

impl NewSubscription {
    /// Creates a subscription request.
    #[must_use]
    pub fn new(
        card_number: impl Into<String>,
        expiration: impl Into<String>,
        amount_minor: i64,
        cycle: impl Into<String>,
    ) -> Self {
        Self {
            card_number: card_number.into(),
            expiration: expiration.into(),
            name: None,
            amount_minor,
            cycle: cycle.into(),
        }
    }

    /// Sets the cardholder name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn to_params(&self) -> RequestParameters {
        let mut params = RequestParameters::new()
            .with(FieldKey::CC, self.card_number.as_str())
            .with(FieldKey::EXP, self.expiration.as_str())
            .with(FieldKey::AMOUNT, self.amount_minor)
            .with(FieldKey::CYCLE, self.cycle.as_str());
        if let Some(name) = &self.name {
            params.insert(FieldKey::NAME, name.as_str());
        }
        params
    }
}

impl fmt::Debug for NewSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSubscription")
            .field("card_number", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .field("name", &self.name)
            .field("amount_minor", &self.amount_minor)
            .field("cycle", &self.cycle)
            .finish()
    }
}

impl Drop for NewSubscription {
    fn drop(&mut self) {
        self.card_number.zeroize();
    }
}

impl From<NewSubscription> for RequestParameters {
    fn from(subscription: NewSubscription) -> Self {
        subscription.to_params()
    }
}

/// Stores a new billing profile; an approved result carries its billing id.
///
/// # Errors
///
/// Returns a transport-class error if the gateway could not be reached.
pub async fn create(
    client: &GatewayClient,
    params: impl Into<RequestParameters>,
) -> Result<GatewayResult> {
    client.submit(RequestKind::Store, params.into()).await
}

/// Changes card or schedule of an existing profile.
///
/// # Errors
///
/// Returns a transport-class error if the gateway could not be reached.
pub async fn update(
    client: &GatewayClient,
    billing_id: &BillingId,
    params: RequestParameters,
) -> Result<GatewayResult> {
    let params = params.with(FieldKey::BILLING_ID, billing_id.as_str());
    client.submit(RequestKind::Store, params).await
}

/// Removes a profile from active use.
///
/// # Errors
///
/// Returns a transport-class error if the gateway could not be reached.
pub async fn delete(client: &GatewayClient, billing_id: &BillingId) -> Result<GatewayResult> {
    let params = RequestParameters::new().with(FieldKey::BILLING_ID, billing_id.as_str());
    client.submit(RequestKind::Unstore, params).await
}

/// One-time sale against a stored profile.
///
/// # Errors
///
/// Returns a transport-class error if the gateway could not be reached.
pub async fn charge(
    client: &GatewayClient,
    billing_id: &BillingId,
    amount_minor: i64,
) -> Result<GatewayResult> {
    let params = RequestParameters::new()
        .with(FieldKey::BILLING_ID, billing_id.as_str())
        .with(FieldKey::AMOUNT, amount_minor);
    client.submit(RequestKind::Sale, params).await
}

/// One-time credit against an earlier transaction.
///
/// # Errors
///
/// Returns a transport-class error if the gateway could not be reached.
pub async fn credit(
    client: &GatewayClient,
    transaction_id: &str,
    amount_minor: i64,
) -> Result<GatewayResult> {
    let params = RequestParameters::new()
        .with(FieldKey::TRANS_ID, transaction_id)
        .with(FieldKey::AMOUNT, amount_minor);
    client.submit(RequestKind::Credit, params).await
}

/// Free-form vault query.
///
/// # Errors
///
/// Returns a transport-class error if the query could not be delivered.
pub async fn query(client: &GatewayClient, params: RequestParameters) -> Result<TabularExport> {
    client.query(params).await
}

/// Transaction history of one profile, optionally narrowed to one action.
///
/// # Errors
///
/// Returns a transport-class error if the query could not be delivered.
pub async fn transactions(
    client: &GatewayClient,
    billing_id: &BillingId,
    action: Option<RequestKind>,
) -> Result<TabularExport> {
    match action {
        None => client.transaction_history(billing_id).await,
        Some(kind) => {
            let params = RequestParameters::new()
                .with(FieldKey::QUERY_TYPE, QUERY_TYPE_TRANSACTION)
                .with(FieldKey::BILLING_ID, billing_id.as_str())
                .with(FieldKey::ACTION, kind.as_str());
            client.query(params).await
        }
    }
}
