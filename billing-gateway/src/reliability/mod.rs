//! Reliability helpers for gateway operations.
//!
//! Nothing in this crate retries a failed call on its own. The only repetition
//! offered is bounded polling for data that the gateway publishes with a delay.

mod poll;

pub use poll::{PollPolicy, poll_until, wait_for_transactions};
