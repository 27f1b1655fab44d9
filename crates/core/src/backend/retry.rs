use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{BackendError, ReservationBackend};
use crate::domain::slot::SlotCandidate;

/// Bounded exponential backoff for transient backend faults.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Delay before retry number `retry` (zero-based), capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(i32::try_from(retry).unwrap_or(i32::MAX));
        let millis = self.base_delay.as_millis() as f64 * factor;
        if !millis.is_finite() || millis >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(millis as u64)
    }
}

/// Wraps a backend so discovery and cancellation are retried on transient
/// errors. `commit_slot` is passed through exactly once per call.
pub struct RetryingBackend<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B> RetryingBackend<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, BackendError>> + Send,
        T: Send,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut retry = 0;
        loop {
            match call().await {
                Err(error) if error.is_transient() && retry + 1 < attempts => {
                    let delay = self.policy.delay_for_retry(retry);
                    tracing::warn!(
                        event_name = "backend.retry",
                        operation,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<B> ReservationBackend for RetryingBackend<B>
where
    B: ReservationBackend,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn discover_slots(&self, date: NaiveDate) -> Result<Vec<SlotCandidate>, BackendError> {
        self.retry("discover_slots", || self.inner.discover_slots(date)).await
    }

    async fn commit_slot(
        &self,
        date: NaiveDate,
        slot: &SlotCandidate,
        party_size: u8,
    ) -> Result<Option<String>, BackendError> {
        self.inner.commit_slot(date, slot, party_size).await
    }

    async fn cancel_reservation(&self, confirmation_token: &str) -> Result<bool, BackendError> {
        self.retry("cancel_reservation", || self.inner.cancel_reservation(confirmation_token)).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, NaiveTime};

    use super::{RetryPolicy, RetryingBackend};
    use crate::backend::{BackendError, MockBackend, ReservationBackend};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 20).expect("date")
    }

    #[test]
    fn delay_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_retry(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn transient_discovery_failures_are_retried() {
        let backend = RetryingBackend::new(MockBackend::new(), fast_policy(3));
        backend.inner().fail_discovery_with([
            BackendError::Transient("timeout".into()),
            BackendError::Transient("timeout".into()),
        ]);

        let slots = backend.discover_slots(date()).await.expect("third attempt succeeds");
        assert!(!slots.is_empty());
        assert_eq!(backend.inner().discover_calls(), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let backend = RetryingBackend::new(MockBackend::new(), fast_policy(2));
        backend.inner().fail_discovery_with([
            BackendError::Transient("a".into()),
            BackendError::Transient("b".into()),
            BackendError::Transient("c".into()),
        ]);

        let error = backend.discover_slots(date()).await.expect_err("exhausted");
        assert_eq!(error, BackendError::Transient("b".into()));
        assert_eq!(backend.inner().discover_calls(), 2);
    }

    #[tokio::test]
    async fn site_errors_are_not_retried() {
        let backend = RetryingBackend::new(MockBackend::new(), fast_policy(3));
        backend.inner().fail_discovery_with([BackendError::Site("maintenance".into())]);

        backend.discover_slots(date()).await.expect_err("site error");
        assert_eq!(backend.inner().discover_calls(), 1);
    }

    #[tokio::test]
    async fn commit_is_attempted_once_even_when_transient() {
        let backend = RetryingBackend::new(MockBackend::new(), fast_policy(3));
        backend.inner().fail_commit_with([BackendError::Transient("socket reset".into())]);
        let eight = NaiveTime::from_hms_opt(8, 0, 0).expect("time");

        let error = backend.book_tee_time(date(), eight, 2, 30).await.expect_err("commit fails");
        assert!(error.is_transient());
        assert_eq!(backend.inner().commit_calls(), 1);
    }
}
