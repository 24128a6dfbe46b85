//! Reconciliation run.

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::{
    model::{BillingId, BillingProfile},
    normalize::{columns, transaction_from_row},
    window::LookbackWindow,
};
use crate::{
    client::GatewayClient,
    error::{GatewayError, Result},
    export::TabularExport,
    params::{FieldKey, RequestParameters},
    store::{BillingStore, InsertOutcome},
};

/// Query type requesting a profile's transaction history.
pub const QUERY_TYPE_TRANSACTION: &str = "transaction";

/// Source of per-profile transaction history exports.
pub trait TransactionSource: Send + Sync {
    /// Fetches the transaction history export for a billing identifier.
    ///
    /// # Errors
    ///
    /// Returns a transport-class error if the export could not be fetched.
    fn transaction_history(
        &self,
        billing_id: &BillingId,
    ) -> impl Future<Output = Result<TabularExport>> + Send;
}

impl TransactionSource for GatewayClient {
    async fn transaction_history(&self, billing_id: &BillingId) -> Result<TabularExport> {
        let params = RequestParameters::new()
            .with(FieldKey::QUERY_TYPE, QUERY_TYPE_TRANSACTION)
            .with(FieldKey::BILLING_ID, billing_id.as_str());
        self.query(params).await
    }
}

/// Counters produced by one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Profiles whose history was fully processed.
    pub profiles_processed: usize,
    /// Profiles abandoned because of a query, export or store failure.
    pub profiles_skipped: usize,
    /// Transactions newly recorded, including those recorded for a profile
    /// before it was abandoned.
    pub transactions_created: usize,
    /// Transactions already recorded and left untouched.
    pub duplicates_skipped: usize,
    /// Export rows that were malformed or lacked required fields.
    pub rows_skipped: usize,
}

impl SyncReport {
    fn absorb(&mut self, profile: &ProfileOutcome) {
        self.transactions_created += profile.created;
        self.duplicates_skipped += profile.duplicates;
        self.rows_skipped += profile.rows_skipped;
    }
}

#[derive(Debug, Default)]
struct ProfileOutcome {
    created: usize,
    duplicates: usize,
    rows_skipped: usize,
}

/// Pulls gateway transaction history and records unseen transactions.
///
/// Profiles are processed one after another. A failure while handling one
/// profile is logged and counted; the run moves on to the next profile.
///
/// # Examples
///
/// ```rust,no_run
/// use billing_gateway::{
///     GatewayClient, GatewayConfig,
///     store::MemoryStore,
///     sync::{LookbackWindow, SyncEngine},
/// };
///
/// # async fn example() -> billing_gateway::Result<()> {
/// let client = GatewayClient::new(&GatewayConfig::default())?;
/// let engine = SyncEngine::new(client, MemoryStore::new());
///
/// let report = engine.run(LookbackWindow::parse_or_default(Some("3h"))).await?;
/// println!("created {} transactions", report.transactions_created);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SyncEngine<S, B> {
    source: S,
    store: B,
}

impl<S, B> SyncEngine<S, B>
where
    S: TransactionSource,
    B: BillingStore,
{
    /// Creates an engine.
    #[must_use]
    pub const fn new(source: S, store: B) -> Self {
        Self { source, store }
    }

    /// The transaction source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The billing store.
    #[must_use]
    pub const fn store(&self) -> &B {
        &self.store
    }

    /// Runs with a window string such as `3h`; malformed or missing windows
    /// mean one hour.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn sync(&self, window: Option<&str>) -> Result<SyncReport> {
        self.run(LookbackWindow::parse_or_default(window)).await
    }

    /// Reconciles every profile eligible within `window` of now.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] only if the eligible profiles cannot be
    /// listed. Per-profile failures are reported through
    /// [`SyncReport::profiles_skipped`].
    pub async fn run(&self, window: LookbackWindow) -> Result<SyncReport> {
        self.run_at(window, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_at(&self, window: LookbackWindow, now: DateTime<Utc>) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id, %window);

        async move {
            let since = window.since(now);
            let profiles = self.store.eligible_profiles(since).await?;
            info!(profiles = profiles.len(), %since, "sync run started");

            let mut report = SyncReport::default();
            for profile in &profiles {
                let mut outcome = ProfileOutcome::default();
                match self.sync_profile(profile, &mut outcome).await {
                    Ok(()) => report.profiles_processed += 1,
                    Err(e) => {
                        warn!(
                            profile_id = %profile.id,
                            created = outcome.created,
                            error = %e,
                            "skipping profile"
                        );
                        report.profiles_skipped += 1;
                    }
                }
                report.absorb(&outcome);
            }

            info!(
                profiles_processed = report.profiles_processed,
                profiles_skipped = report.profiles_skipped,
                transactions_created = report.transactions_created,
                duplicates_skipped = report.duplicates_skipped,
                rows_skipped = report.rows_skipped,
                "sync run finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Reconciles one profile, counting into `outcome` as it goes so that work
    /// done before an error is still reported.
    async fn sync_profile(
        &self,
        profile: &BillingProfile,
        outcome: &mut ProfileOutcome,
    ) -> Result<()> {
        let billing_id = profile.billing_id.as_ref().ok_or_else(|| {
            GatewayError::InvalidBillingId(format!("profile {} has no billing id", profile.id))
        })?;

        let export = self.source.transaction_history(billing_id).await?;
        let parsed = export.parse()?;
        if !parsed.columns().contains(columns::TRANS_ID) {
            let header = export.as_str().lines().next().unwrap_or_default();
            return Err(GatewayError::UnexpectedResponse(format!(
                "export header has no {} column: {}",
                columns::TRANS_ID,
                header.chars().take(80).collect::<String>()
            )));
        }

        outcome.rows_skipped += parsed.malformed().len();

        for row in parsed.rows() {
            if let Some(transaction_id) = row.get(columns::TRANS_ID)
                && self.store.transaction_exists(profile.id, transaction_id).await?
            {
                outcome.duplicates += 1;
                continue;
            }

            let record = match transaction_from_row(profile, &row) {
                Ok(record) => record,
                Err(e) => {
                    warn!(billing_id = %billing_id, error = %e, "skipping export row");
                    outcome.rows_skipped += 1;
                    continue;
                }
            };

            match self.store.insert_transaction(record).await? {
                InsertOutcome::Inserted => outcome.created += 1,
                InsertOutcome::Duplicate => outcome.duplicates += 1,
            }
        }

        debug!(
            billing_id = %billing_id,
            created = outcome.created,
            duplicates = outcome.duplicates,
            rows_skipped = outcome.rows_skipped,
            "profile reconciled"
        );
        Ok(())
    }
}
