//! Native channel.
//!
//! The native integration is an external, pre-verified library that takes a flat
//! string map and returns a flat string map. It provides its own failover and
//! transport security; this module only adapts it to [`Channel`].

use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::instrument;

use super::ChannelKind;
use crate::{
    error::{GatewayError, Result},
    params::WireFields,
    transport::{Channel, sealed},
};

/// Failure reported by a native link.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NativeLinkError(pub String);

/// External native integration.
///
/// Implementations wrap the vendor library. `send` is blocking; the channel
/// runs it on the blocking thread pool.
pub trait NativeLink: Send + Sync + 'static {
    /// Availability probe, consulted once when the transport is selected.
    fn is_available(&self) -> bool {
        true
    }

    /// Sends a request and returns the response fields.
    ///
    /// # Errors
    ///
    /// Returns [`NativeLinkError`] if the library could not complete the call.
    fn send(&self, fields: &WireFields) -> std::result::Result<WireFields, NativeLinkError>;
}

/// Channel backed by a [`NativeLink`].
#[derive(Clone)]
pub struct NativeChannel {
    link: Arc<dyn NativeLink>,
}

impl sealed::private::Sealed for NativeChannel {}

impl NativeChannel {
    /// Wraps a native link.
    #[must_use]
    pub fn new(link: Arc<dyn NativeLink>) -> Self {
        Self { link }
    }

    /// Runs the link's availability probe.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.link.is_available()
    }
}

impl fmt::Debug for NativeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeChannel").finish_non_exhaustive()
    }
}

impl Channel for NativeChannel {
    #[instrument(skip_all, fields(field_count = fields.len()))]
    async fn send<'a>(&'a self, fields: &'a WireFields) -> Result<WireFields> {
        let link = Arc::clone(&self.link);
        let request = fields.clone();

        let response = tokio::task::spawn_blocking(move || link.send(&request))
            .await
            .map_err(|e| GatewayError::Channel(format!("native link task failed: {e}")))?
            .map_err(|e| GatewayError::Channel(e.to_string()))?;

        if response.is_empty() {
            return Err(GatewayError::UnexpectedResponse(
                "native link returned no fields".to_owned(),
            ));
        }
        Ok(response)
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Native
    }
}
