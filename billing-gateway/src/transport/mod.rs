//! Transport layer.
//!
//! The same flat request can travel over two channels:
//!
//! - **Native**: an externally supplied, pre-verified integration library
//!   ([`NativeLink`]) that offers its own failover and keeps credentials off the
//!   wire. Preferred whenever it is present.
//! - **HTTPS**: form-encoded POST to the gateway over a certificate-validated
//!   connection ([`HttpsChannel`]).
//!
//! [`TransportSelector`] picks one channel once and sticks to it. The choice
//! decides which password a transactional request carries (see
//! [`ChannelKind::transaction_password`]), so switching channels mid-session is
//! never done implicitly.
//!
//! # Examples
//!
//! ```rust,no_run
//! use billing_gateway::transport::{
//!     ChannelKind, EndpointConfig, HttpConfig, HttpsChannel, TransportSelector,
//! };
//!
//! # fn example() -> billing_gateway::error::Result<()> {
//! let https = HttpsChannel::new(&EndpointConfig::default(), &HttpConfig::default())?;
//! let selector = TransportSelector::new(https, None);
//!
//! assert_eq!(selector.select().kind(), ChannelKind::Https);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::fmt;

use crate::{error::Result, params::WireFields};

pub mod config;
pub mod https;
pub mod native;
mod sealed;
pub mod selector;

pub use config::{EndpointConfig, HttpConfig};
pub use https::{HttpsChannel, parse_response_body};
pub use native::{NativeChannel, NativeLink, NativeLinkError};
pub use selector::{ChannelHandle, TransportSelector};

/// Which channel carried a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// External native integration.
    Native,
    /// HTTPS form POST.
    Https,
}

/// Which password authenticates a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRoute {
    /// The operating password.
    Operating,
    /// The vault password.
    Vault,
}

impl ChannelKind {
    /// Password used for transactional calls on this channel.
    ///
    /// HTTPS transactional calls are routed through the vault subsystem and
    /// therefore authenticate with the vault password.
    #[must_use]
    pub const fn transaction_password(self) -> PasswordRoute {
        match self {
            Self::Native => PasswordRoute::Operating,
            Self::Https => PasswordRoute::Vault,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel able to carry transactional requests.
///
/// Sealed: implemented only by [`NativeChannel`] and [`HttpsChannel`].
pub trait Channel: sealed::private::Sealed + Send + Sync {
    /// Sends a transactional request and returns the flat response fields.
    ///
    /// # Errors
    ///
    /// Returns a transport-class [`GatewayError`](crate::GatewayError) if the
    /// gateway could not be reached or did not answer with a parseable response.
    fn send<'a>(
        &'a self,
        fields: &'a WireFields,
    ) -> impl Future<Output = Result<WireFields>> + Send + 'a;

    /// Which channel this is.
    fn kind(&self) -> ChannelKind;
}
