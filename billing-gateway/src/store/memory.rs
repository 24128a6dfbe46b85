//! In-memory store.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BillingStore, InsertOutcome, state::StoreState};
use crate::{
    error::Result,
    sync::{BillingProfile, TransactionRecord},
};

/// Store kept entirely in memory.
///
/// # Examples
///
/// ```
/// use billing_gateway::store::MemoryStore;
///
/// # async fn example() {
/// let store = MemoryStore::new();
/// assert_eq!(store.transaction_count().await, 0);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given profiles.
    #[must_use]
    pub fn with_profiles(profiles: impl IntoIterator<Item = BillingProfile>) -> Self {
        let state = StoreState::with_profiles(profiles.into_iter().collect());
        Self { state: Mutex::new(state) }
    }

    /// Adds a profile.
    pub async fn add_profile(&self, profile: BillingProfile) {
        self.state.lock().await.profiles.push(profile);
    }

    /// Transactions recorded for a profile, in insertion order.
    pub async fn transactions_for(&self, profile_id: Uuid) -> Vec<TransactionRecord> {
        self.state.lock().await.transactions_for(profile_id)
    }

    /// Total number of recorded transactions.
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

impl BillingStore for MemoryStore {
    async fn eligible_profiles(&self, since: DateTime<Utc>) -> Result<Vec<BillingProfile>> {
        Ok(self.state.lock().await.eligible_profiles(since))
    }

    async fn transaction_exists(&self, profile_id: Uuid, transaction_id: &str) -> Result<bool> {
        Ok(self.state.lock().await.contains(profile_id, transaction_id))
    }

    async fn insert_transaction(&self, record: TransactionRecord) -> Result<InsertOutcome> {
        Ok(self.state.lock().await.insert(record))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};
    use rust_decimal::Decimal;

    use super::*;

    fn record(profile_id: Uuid, transaction_id: &str) -> TransactionRecord {
        TransactionRecord {
            profile_id,
            account_id: Uuid::new_v4(),
            transaction_id: transaction_id.to_owned(),
            transaction_date: NaiveDate::from_ymd_opt(2008, 10, 6)
                .unwrap()
                .and_hms_opt(14, 2, 11)
                .unwrap(),
            transaction_kind: Some("sale".to_owned()),
            amount: Decimal::new(1200, 2),
            card_fragment: None,
            card_brand: None,
            cardholder_name: None,
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent() {
        let store = MemoryStore::new();
        let profile_id = Uuid::new_v4();

        assert_eq!(
            store.insert_transaction(record(profile_id, "A-1")).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_transaction(record(profile_id, "A-1")).await.unwrap(),
            InsertOutcome::Duplicate
        );
        assert!(store.transaction_exists(profile_id, "A-1").await.unwrap());
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_same_transaction_id_on_other_profile() {
        let store = MemoryStore::new();
        store.insert_transaction(record(Uuid::new_v4(), "A-1")).await.unwrap();

        let other = Uuid::new_v4();
        assert!(!store.transaction_exists(other, "A-1").await.unwrap());
        assert_eq!(
            store.insert_transaction(record(other, "A-1")).await.unwrap(),
            InsertOutcome::Inserted
        );
    }

    #[tokio::test]
    async fn test_eligible_profiles() {
        let now = Utc::now();
        let account = Uuid::new_v4();
        let recent = BillingProfile::new(account, None, now - TimeDelta::minutes(10), 1200);
        let stale = BillingProfile::new(account, None, now - TimeDelta::days(2), 1200);
        let store = MemoryStore::with_profiles([recent.clone(), stale]);

        let eligible = store.eligible_profiles(now - TimeDelta::hours(1)).await.unwrap();
        assert_eq!(eligible, vec![recent]);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_create_one_record() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let profile_id = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    store.insert_transaction(record(profile_id, "A-1")).await
                })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.transaction_count().await, 1);
    }
}
