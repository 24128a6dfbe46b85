//! Bounded polling for conditions that become true on the gateway side.
//!
//! A freshly charged profile does not show up in the vault's transaction
//! history right away. [`poll_until`] re-runs a check on a backoff schedule and
//! gives up with [`GatewayError::PollTimeout`] once the attempt budget is spent.

use std::time::Duration;

#[allow(
    redundant_imports,
    reason = "Future needed in generic bounds despite being in Edition 2024 prelude"
)]
use std::future::Future;

use tracing::{debug, info, warn};

use crate::{
    error::{GatewayError, Result},
    export::TabularExport,
    sync::{BillingId, TransactionSource},
};

/// Attempt budget and delay schedule for [`poll_until`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use billing_gateway::reliability::PollPolicy;
///
/// // Default policy: 10 attempts, 1s first delay, 30s max delay
/// let policy = PollPolicy::default();
/// assert_eq!(policy.max_attempts, 10);
///
/// let quick = PollPolicy::fixed(3, Duration::from_millis(5));
/// assert_eq!(quick.max_interval, Duration::from_millis(5));
/// ```
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Maximum number of checks (default: 10)
    pub max_attempts: u32,
    /// Delay after the first unmet check (default: 1s)
    pub initial_interval: Duration,
    /// Upper bound on the delay between checks (default: 30s)
    pub max_interval: Duration,
    /// Growth factor applied to the delay after each unmet check (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl PollPolicy {
    /// Policy with a constant delay between checks.
    #[must_use]
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            initial_interval: interval,
            max_interval: interval,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before check number `attempt + 1`, capped at `max_interval`.
    fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_interval.as_secs_f64() * factor)
            .map_or(self.max_interval, |delay| delay.min(self.max_interval))
    }
}

/// Runs `check` until it yields `Some`, sleeping between unmet checks.
///
/// An `Err` from `check` ends polling immediately; only the "not yet" answer
/// (`Ok(None)`) is retried.
///
/// # Examples
///
/// ```
/// use std::{
///     sync::atomic::{AtomicU32, Ordering},
///     time::Duration,
/// };
///
/// use billing_gateway::reliability::{PollPolicy, poll_until};
///
/// # async fn example() -> billing_gateway::Result<()> {
/// let checks = &AtomicU32::new(0);
/// let policy = PollPolicy::fixed(5, Duration::from_millis(1));
///
/// let value = poll_until(&policy, "third check", || async move {
///     let n = checks.fetch_add(1, Ordering::Relaxed);
///     Ok((n == 2).then_some(n))
/// })
/// .await?;
///
/// assert_eq!(value, 2);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the first error raised by `check`, or [`GatewayError::PollTimeout`]
/// when `max_attempts` checks came back unmet. A policy with zero attempts
/// times out without calling `check`.
pub async fn poll_until<F, Fut, T>(
    policy: &PollPolicy,
    waiting_for: &str,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 0..policy.max_attempts {
        if let Some(value) = check().await? {
            if attempt > 0 {
                info!(attempt = attempt + 1, waiting_for, "poll condition met");
            }
            return Ok(value);
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay_after(attempt);
            debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                waiting_for,
                "condition not met yet"
            );
            tokio::time::sleep(delay).await;
        }
    }

    warn!(attempts = policy.max_attempts, waiting_for, "poll attempts exhausted");
    Err(GatewayError::PollTimeout {
        attempts: policy.max_attempts,
        waiting_for: waiting_for.to_owned(),
    })
}

/// Queries a profile's transaction history until the export carries at least
/// one data row.
///
/// # Errors
///
/// Returns the query error, or [`GatewayError::PollTimeout`] if the history
/// stays empty for the whole policy.
pub async fn wait_for_transactions<S>(
    source: &S,
    billing_id: &BillingId,
    policy: &PollPolicy,
) -> Result<TabularExport>
where
    S: TransactionSource,
{
    let waiting_for = format!("transactions for {billing_id}");
    poll_until(policy, &waiting_for, || async move {
        let export = source.transaction_history(billing_id).await?;
        Ok(export.has_rows().then_some(export))
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    fn quick(max_attempts: u32) -> PollPolicy {
        PollPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_poll_policy_default() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.max_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_fixed_policy_delay_is_constant() {
        let policy = PollPolicy::fixed(4, Duration::from_millis(250));
        assert_eq!(policy.delay_after(0), Duration::from_millis(250));
        assert_eq!(policy.delay_after(3), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_condition_met_first_check() {
        let checks = &AtomicU32::new(0);
        let value = poll_until(&quick(3), "value", || async move {
            checks.fetch_add(1, Ordering::SeqCst);
            Ok(Some(42))
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_condition_met_after_unmet_checks() {
        let checks = &AtomicU32::new(0);
        let value = poll_until(&quick(5), "third check", || async move {
            let n = checks.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n == 3).then_some(n))
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_reports_attempts() {
        let checks = &AtomicU32::new(0);
        let err = poll_until(&quick(3), "nothing", || async move {
            checks.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<()>, GatewayError>(None)
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::PollTimeout { attempts: 3, ref waiting_for } if waiting_for == "nothing"
        ));
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_stops_polling() {
        let checks = &AtomicU32::new(0);
        let err = poll_until(&quick(5), "value", || async move {
            checks.fetch_add(1, Ordering::SeqCst);
            Err::<Option<()>, _>(GatewayError::UnexpectedStatus { status: 503 })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::UnexpectedStatus { status: 503 }));
        assert_eq!(checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_checks() {
        let checks = &AtomicU32::new(0);
        let result = poll_until(&quick(0), "value", || async move {
            checks.fetch_add(1, Ordering::SeqCst);
            Ok(Some(()))
        })
        .await;

        assert!(matches!(result, Err(GatewayError::PollTimeout { attempts: 0, .. })));
        assert_eq!(checks.load(Ordering::SeqCst), 0);
    }

    struct DelayedHistory {
        bodies: Mutex<Vec<&'static str>>,
    }

    impl TransactionSource for DelayedHistory {
        async fn transaction_history(&self, _billing_id: &BillingId) -> Result<TabularExport> {
            let mut bodies = self.bodies.lock().unwrap();
            let body = if bodies.len() > 1 { bodies.remove(0) } else { bodies[0] };
            Ok(TabularExport::new(body))
        }
    }

    #[tokio::test]
    async fn test_wait_for_transactions() {
        let source = DelayedHistory {
            bodies: Mutex::new(vec!["transid,amount\n", "transid,amount\nA-1,100\n"]),
        };
        let billing_id = BillingId::parse("Q4D2K1").unwrap();

        let export = wait_for_transactions(&source, &billing_id, &quick(3)).await.unwrap();
        assert_eq!(export.data_line_count(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_transactions_times_out() {
        let source = DelayedHistory { bodies: Mutex::new(vec!["transid,amount\n"]) };
        let billing_id = BillingId::parse("Q4D2K1").unwrap();

        let err = wait_for_transactions(&source, &billing_id, &quick(2)).await.unwrap_err();
        assert!(matches!(err, GatewayError::PollTimeout { attempts: 2, .. }));
    }
}
