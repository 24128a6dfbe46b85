//! Persistence contract for profiles and reconciled transactions.
//!
//! The sync engine only needs three things from storage: the profiles to
//! reconcile, a membership test for already-recorded transactions, and an
//! atomic insert-if-absent. [`MemoryStore`] and [`FileStore`] implement the
//! contract for tests and the command-line job.

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::Result,
    sync::{BillingProfile, TransactionRecord},
};

mod file;
mod memory;
mod state;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Result of [`BillingStore::insert_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was new and has been stored.
    Inserted,
    /// A record with the same profile and transaction id already existed.
    Duplicate,
}

/// Storage for billing profiles and their transactions.
pub trait BillingStore: Send + Sync {
    /// Paying profiles created after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`](crate::GatewayError::Store) if the
    /// profiles cannot be read.
    fn eligible_profiles(
        &self,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<BillingProfile>>> + Send;

    /// Whether a transaction is already recorded for the profile.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`](crate::GatewayError::Store) on read failure.
    fn transaction_exists(
        &self,
        profile_id: Uuid,
        transaction_id: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Stores the record unless one with the same profile and transaction id
    /// exists. The check and the write are atomic.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`](crate::GatewayError::Store) on write failure.
    fn insert_transaction(
        &self,
        record: TransactionRecord,
    ) -> impl Future<Output = Result<InsertOutcome>> + Send;
}
