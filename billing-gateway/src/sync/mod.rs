//! Transaction reconciliation.
//!
//! A run lists the profiles eligible within a lookback window, pulls each
//! profile's transaction history export from the vault, and records every
//! transaction the store has not seen yet:
//!
//! ```text
//! Select ──▶ for each profile: Query ──▶ Parse ──▶ Diff ──▶ Persist ──▶ Done
//! ```
//!
//! Running twice over the same export records each transaction once.

mod engine;
mod model;
mod normalize;
mod window;

pub use engine::{QUERY_TYPE_TRANSACTION, SyncEngine, SyncReport, TransactionSource};
pub use model::{BillingDetails, BillingId, BillingProfile, TransactionRecord};
pub use normalize::{card_brand, columns, parse_amount, parse_timestamp, transaction_from_row};
pub use window::{LookbackWindow, WindowUnit};
