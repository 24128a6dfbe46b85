//! Transport selection.

use std::sync::{Arc, OnceLock};

use tracing::info;

use super::{
    Channel, ChannelKind,
    https::HttpsChannel,
    native::{NativeChannel, NativeLink},
};
use crate::{
    error::{GatewayError, Result},
    params::WireFields,
};

/// Borrowed handle to the selected channel.
#[derive(Debug, Clone, Copy)]
pub enum ChannelHandle<'a> {
    /// Native integration.
    Native(&'a NativeChannel),
    /// HTTPS fallback.
    Https(&'a HttpsChannel),
}

impl ChannelHandle<'_> {
    /// Which channel this handle points at.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        match self {
            Self::Native(_) => ChannelKind::Native,
            Self::Https(_) => ChannelKind::Https,
        }
    }

    /// Sends a transactional request over the selected channel.
    ///
    /// # Errors
    ///
    /// Propagates the channel's transport error unchanged.
    pub async fn send(&self, fields: &WireFields) -> Result<WireFields> {
        match self {
            Self::Native(channel) => channel.send(fields).await,
            Self::Https(channel) => channel.send(fields).await,
        }
    }
}

/// Chooses between the native and HTTPS channels.
///
/// The decision is made on the first [`select`](Self::select) and cached for the
/// lifetime of the selector: native when a link was supplied and its probe
/// reports it available, HTTPS otherwise. A native link failing later does not
/// change the decision.
#[derive(Debug)]
pub struct TransportSelector {
    https: HttpsChannel,
    native: Option<NativeChannel>,
    decision: OnceLock<ChannelKind>,
}

impl TransportSelector {
    /// Creates a selector that probes the native link on first use.
    #[must_use]
    pub fn new(https: HttpsChannel, native: Option<Arc<dyn NativeLink>>) -> Self {
        Self { https, native: native.map(NativeChannel::new), decision: OnceLock::new() }
    }

    /// Creates a selector pinned to one channel, skipping the probe.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] when forcing the native channel without
    /// supplying a link.
    pub fn forced(
        kind: ChannelKind,
        https: HttpsChannel,
        native: Option<Arc<dyn NativeLink>>,
    ) -> Result<Self> {
        if kind == ChannelKind::Native && native.is_none() {
            return Err(GatewayError::Config(
                "cannot force the native channel without a native link".to_owned(),
            ));
        }
        let selector = Self::new(https, native);
        let _ = selector.decision.set(kind);
        Ok(selector)
    }

    /// Returns the selected channel, deciding on first call.
    #[must_use]
    pub fn select(&self) -> ChannelHandle<'_> {
        let kind = *self.decision.get_or_init(|| self.probe());
        match (kind, &self.native) {
            (ChannelKind::Native, Some(native)) => ChannelHandle::Native(native),
            _ => ChannelHandle::Https(&self.https),
        }
    }

    /// The HTTPS channel, which always serves vault queries.
    #[must_use]
    pub const fn https(&self) -> &HttpsChannel {
        &self.https
    }

    fn probe(&self) -> ChannelKind {
        let kind = match &self.native {
            Some(native) if native.is_available() => ChannelKind::Native,
            _ => ChannelKind::Https,
        };
        info!(channel = %kind, "transport selected");
        kind
    }
}
