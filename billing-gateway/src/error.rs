//! Error types for the billing gateway bridge.
//!
//! All errors implement the standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Transport Errors** ([`GatewayError::Http`], [`GatewayError::UnexpectedStatus`],
//!   [`GatewayError::Transport`], [`GatewayError::Channel`],
//!   [`GatewayError::UnexpectedResponse`]): the gateway did not answer, or answered with
//!   something that is not a gateway response
//! - **Validation Errors** ([`GatewayError::InvalidInput`], [`GatewayError::InvalidWindow`],
//!   [`GatewayError::InvalidBillingId`], [`GatewayError::Config`]): input or configuration
//!   rejected before any network call
//! - **Polling** ([`GatewayError::PollTimeout`]): bounded wait exhausted
//! - **Storage** ([`GatewayError::Store`]): the local billing store failed
//!
//! A gateway *decline* is never an error. Declines, bad-data and error statuses come back
//! as a successfully parsed [`GatewayResult`](crate::GatewayResult).
//!
//! # Examples
//!
//! ```
//! use billing_gateway::error::{GatewayError, Result};
//!
//! fn require_https(url: &str) -> Result<&str> {
//!     if !url.starts_with("https://") {
//!         return Err(GatewayError::Config("gateway URL must use HTTPS".to_owned()));
//!     }
//!     Ok(url)
//! }
//!
//! assert!(require_https("http://vault.example.com").is_err());
//! ```

use thiserror::Error;

/// Result type alias for gateway operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while talking to the billing gateway or reconciling its data.
///
/// # Error Recovery
///
/// - **Transport errors** ([`Http`](Self::Http), [`UnexpectedStatus`](Self::UnexpectedStatus)):
///   nothing is retried internally; let the scheduler run again later
/// - **Channel errors** ([`Channel`](Self::Channel)): the native link failed mid-session;
///   investigate the native integration rather than switching transports
/// - **Validation errors** ([`InvalidInput`](Self::InvalidInput), [`Config`](Self::Config)):
///   fix input and retry
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed before a response was received.
    ///
    /// Wraps [`reqwest::Error`]: connection refused, DNS failures, timeouts and
    /// certificate validation failures all land here.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success HTTP status.
    #[error("gateway returned HTTP status {status}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// Transport-level setup or request construction failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The native channel failed.
    ///
    /// Raised when the native link reports an error or disappears after the transport
    /// was selected. Never converted into an HTTPS retry: the two channels carry
    /// different passwords.
    #[error("native channel error: {0}")]
    Channel(String),

    /// The gateway responded, but not in a shape this client understands.
    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    /// Configuration is invalid or could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Caller input was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Lookback window string could not be parsed.
    ///
    /// Valid forms are `<N>m`, `<N>h` and `<N>d`.
    ///
    /// # Examples
    ///
    /// ```
    /// use billing_gateway::error::GatewayError;
    ///
    /// let err = GatewayError::InvalidWindow("3w".to_owned());
    /// assert_eq!(err.to_string(), "invalid lookback window: 3w");
    /// ```
    #[error("invalid lookback window: {0}")]
    InvalidWindow(String),

    /// Billing identifier is not six ASCII alphanumeric characters.
    #[error("invalid billing id: {0}")]
    InvalidBillingId(String),

    /// A bounded poll ran out of attempts.
    #[error("gave up after {attempts} attempts waiting for {waiting_for}")]
    PollTimeout {
        /// Number of attempts made.
        attempts: u32,
        /// Description of the awaited condition.
        waiting_for: String,
    },

    /// The billing store failed.
    #[error("billing store error: {0}")]
    Store(String),
}

impl GatewayError {
    /// Returns true if the gateway never produced a parsed answer.
    ///
    /// Used by callers that need to tell "the gateway said no" apart from
    /// "we do not know what the gateway said".
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::UnexpectedStatus { .. }
                | Self::Transport(_)
                | Self::Channel(_)
                | Self::UnexpectedResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_display() {
        let error = GatewayError::UnexpectedStatus { status: 503 };
        assert_eq!(error.to_string(), "gateway returned HTTP status 503");
    }

    #[test]
    fn test_channel_error_display() {
        let error = GatewayError::Channel("link closed".into());
        assert!(error.to_string().contains("native channel error"));
    }

    #[test]
    fn test_poll_timeout_display() {
        let error =
            GatewayError::PollTimeout { attempts: 8, waiting_for: "transaction history".into() };
        assert_eq!(error.to_string(), "gave up after 8 attempts waiting for transaction history");
    }

    #[test]
    fn test_is_transport() {
        assert!(GatewayError::UnexpectedStatus { status: 500 }.is_transport());
        assert!(GatewayError::Channel("x".into()).is_transport());
        assert!(GatewayError::UnexpectedResponse("x".into()).is_transport());
        assert!(!GatewayError::InvalidWindow("x".into()).is_transport());
        assert!(!GatewayError::Store("x".into()).is_transport());
    }
}
