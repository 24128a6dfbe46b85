//! Sealed trait marker for channel implementations.
//!
//! Only the native and HTTPS channels in this crate may implement
//! [`Channel`](super::Channel); each decides which password travels with a request.

pub(crate) mod private {
    /// Sealed trait marker.
    pub trait Sealed {}
}
