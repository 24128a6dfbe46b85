//! Profiles and transactions exchanged with the billing store.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GatewayError, Result};

const BILLING_ID_LEN: usize = 6;

/// Gateway-assigned key of a stored payment profile.
///
/// Always six ASCII alphanumeric characters.
///
/// # Examples
///
/// ```
/// use billing_gateway::sync::BillingId;
///
/// let id: BillingId = "Q4D2K1".parse().unwrap();
/// assert_eq!(id.as_str(), "Q4D2K1");
///
/// assert!(BillingId::parse("Q4D2").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingId(String);

impl BillingId {
    /// Validates and wraps a billing identifier.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidBillingId`] unless the value is exactly six
    /// ASCII alphanumeric characters.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.len() == BILLING_ID_LEN && value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(value.to_owned()))
        } else {
            Err(GatewayError::InvalidBillingId(value.to_owned()))
        }
    }

    /// The identifier as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BillingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BillingId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BillingId {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<BillingId> for String {
    fn from(id: BillingId) -> Self {
        id.0
    }
}

/// Cardholder and billing metadata kept alongside a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingDetails {
    /// Cardholder full name.
    pub full_name: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Postal code.
    pub zip_code: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// Card brand as last reported.
    pub card_type: Option<String>,
    /// Masked card number.
    pub card_fragment: Option<String>,
    /// Card expiration.
    pub expiration: Option<NaiveDate>,
}

/// A locally known subscription backed by a gateway billing profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingProfile {
    /// Local profile id.
    pub id: Uuid,
    /// Owning account.
    pub account_id: Uuid,
    /// Gateway billing identifier; absent until the first successful store.
    pub billing_id: Option<BillingId>,
    /// When the profile was created locally.
    pub created_at: DateTime<Utc>,
    /// Schedule length in billing cycles.
    pub length: u32,
    /// Recurring amount in minor units.
    pub amount_minor: i64,
    /// Cardholder metadata.
    #[serde(default)]
    pub details: BillingDetails,
}

impl BillingProfile {
    /// Creates a profile with empty metadata.
    #[must_use]
    pub fn new(
        account_id: Uuid,
        billing_id: Option<BillingId>,
        created_at: DateTime<Utc>,
        amount_minor: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            billing_id,
            created_at,
            length: 1,
            amount_minor,
            details: BillingDetails::default(),
        }
    }

    /// Paying profile created strictly after `since`.
    #[must_use]
    pub fn is_eligible(&self, since: DateTime<Utc>) -> bool {
        self.amount_minor > 0 && self.created_at > since
    }
}

/// One gateway transaction materialized for a profile.
///
/// Unique per `(profile_id, transaction_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Owning profile.
    pub profile_id: Uuid,
    /// Owning account, copied from the profile.
    pub account_id: Uuid,
    /// Gateway transaction id.
    pub transaction_id: String,
    /// Gateway-local timestamp.
    pub transaction_date: NaiveDateTime,
    /// Gateway action name, such as `sale` or `credit`.
    pub transaction_kind: Option<String>,
    /// Amount in major units.
    pub amount: Decimal,
    /// Masked card number.
    pub card_fragment: Option<String>,
    /// Normalized card brand.
    pub card_brand: Option<String>,
    /// Cardholder name.
    pub cardholder_name: Option<String>,
}
