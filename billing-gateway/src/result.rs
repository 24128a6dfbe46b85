//! Typed gateway response.

use std::fmt;

use crate::params::{FieldKey, ResponseFields};

/// Response status reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Transaction approved.
    Approved,
    /// Request accepted (profile updates, unstores, credits).
    Accepted,
    /// Card declined.
    Declined,
    /// Request fields were malformed.
    BadData,
    /// Gateway-side processing error.
    Error,
    /// Missing or unrecognized status token.
    Unknown(String),
}

impl Status {
    /// Classifies a raw status token.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "approved" => Self::Approved,
            "accepted" => Self::Accepted,
            "decline" | "declined" => Self::Declined,
            "baddata" => Self::BadData,
            "error" => Self::Error,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Returns the gateway token for this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approved => "approved",
            Self::Accepted => "accepted",
            Self::Declined => "decline",
            Self::BadData => "baddata",
            Self::Error => "error",
            Self::Unknown(token) => token,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed response of a transactional gateway call.
///
/// Built once from the channel response and never mutated. The status is
/// derived from the `status` field at construction.
///
/// # Examples
///
/// ```
/// use billing_gateway::{GatewayResult, params::decode};
///
/// let result = GatewayResult::new(decode([
///     ("status", "approved"),
///     ("billingid", "Q4D2K1"),
///     ("transid", "025-0000083216"),
/// ]));
///
/// assert!(result.is_approved());
/// assert!(!result.is_declined());
/// assert_eq!(result.billing_id(), Some("Q4D2K1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResult {
    fields: ResponseFields,
    status: Status,
}

impl GatewayResult {
    /// Wraps decoded response fields.
    #[must_use]
    pub fn new(fields: ResponseFields) -> Self {
        let status = fields
            .get(&FieldKey::STATUS)
            .map_or_else(|| Status::Unknown(String::new()), |token| Status::from_token(token));
        Self { fields, status }
    }

    /// Derived status.
    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// True iff the status is `approved`.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self.status, Status::Approved)
    }

    /// True iff the status is `accepted`.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self.status, Status::Accepted)
    }

    /// True iff the status is `decline`.
    #[must_use]
    pub const fn is_declined(&self) -> bool {
        matches!(self.status, Status::Declined)
    }

    /// True iff the status is `baddata`.
    #[must_use]
    pub const fn is_bad_data(&self) -> bool {
        matches!(self.status, Status::BadData)
    }

    /// True iff the status is `error`.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, Status::Error)
    }

    /// Raw value of any response field.
    #[must_use]
    pub fn get(&self, key: &FieldKey) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns true if the response carries the field.
    #[must_use]
    pub fn contains(&self, key: &FieldKey) -> bool {
        self.fields.contains_key(key)
    }

    /// Billing identifier assigned by a successful store.
    #[must_use]
    pub fn billing_id(&self) -> Option<&str> {
        self.get(&FieldKey::BILLING_ID)
    }

    /// Gateway transaction id.
    #[must_use]
    pub fn transaction_id(&self) -> Option<&str> {
        self.get(&FieldKey::TRANS_ID)
    }

    /// Error detail on `error` / `baddata` responses.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.get(&FieldKey::ERROR)
    }

    /// Decline reason on `decline` responses.
    #[must_use]
    pub fn decline_type(&self) -> Option<&str> {
        self.get(&FieldKey::DECLINE_TYPE)
    }

    /// Field names the gateway rejected on `baddata` responses.
    #[must_use]
    pub fn offenders(&self) -> Vec<&str> {
        self.get(&FieldKey::OFFENDERS)
            .map(|list| list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// All response fields.
    #[must_use]
    pub const fn fields(&self) -> &ResponseFields {
        &self.fields
    }
}
