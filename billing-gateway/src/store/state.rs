//! Shared in-memory state behind both store implementations.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::InsertOutcome;
use crate::sync::{BillingProfile, TransactionRecord};

#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct StoreState {
    #[serde(default)]
    pub(super) profiles: Vec<BillingProfile>,
    #[serde(default)]
    pub(super) transactions: Vec<TransactionRecord>,
    #[serde(skip)]
    index: HashSet<(Uuid, String)>,
}

impl StoreState {
    pub(super) fn with_profiles(profiles: Vec<BillingProfile>) -> Self {
        Self { profiles, ..Self::default() }
    }

    /// Rebuilds the uniqueness index after deserialization.
    pub(super) fn reindex(&mut self) {
        self.index = self
            .transactions
            .iter()
            .map(|record| (record.profile_id, record.transaction_id.clone()))
            .collect();
    }

    pub(super) fn eligible_profiles(&self, since: DateTime<Utc>) -> Vec<BillingProfile> {
        self.profiles.iter().filter(|profile| profile.is_eligible(since)).cloned().collect()
    }

    pub(super) fn contains(&self, profile_id: Uuid, transaction_id: &str) -> bool {
        self.index.contains(&(profile_id, transaction_id.to_owned()))
    }

    pub(super) fn insert(&mut self, record: TransactionRecord) -> InsertOutcome {
        if self.index.insert((record.profile_id, record.transaction_id.clone())) {
            self.transactions.push(record);
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        }
    }

    pub(super) fn transactions_for(&self, profile_id: Uuid) -> Vec<TransactionRecord> {
        self.transactions.iter().filter(|record| record.profile_id == profile_id).cloned().collect()
    }
}
