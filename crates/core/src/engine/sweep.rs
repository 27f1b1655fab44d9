use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{BookingEngine, ExecutionOutcome};
use crate::domain::booking::{Booking, BookingId};
use crate::errors::ApplicationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Failed,
    /// The per-item deadline fired; the booking keeps whatever status the
    /// executor had reached.
    TimedOut,
    /// The executor could not run, e.g. the store was unreachable.
    Errored,
    /// Another caller claimed the booking between discovery and execution.
    Skipped,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemReport {
    pub booking_id: BookingId,
    pub outcome: ItemOutcome,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_token: Option<String>,
}

/// Summary of one sweep, in processing order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRunReport {
    pub executed_at: DateTime<Utc>,
    pub total_due: usize,
    pub succeeded: usize,
    /// Failed, timed-out and errored items together.
    pub failed: usize,
    pub timed_out: usize,
    pub errored: usize,
    pub skipped: usize,
    pub items: Vec<BatchItemReport>,
}

impl BatchRunReport {
    fn new(executed_at: DateTime<Utc>, total_due: usize) -> Self {
        Self {
            executed_at,
            total_due,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            errored: 0,
            skipped: 0,
            items: Vec::with_capacity(total_due),
        }
    }

    fn push(&mut self, item: BatchItemReport) {
        match item.outcome {
            ItemOutcome::Succeeded => self.succeeded += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::TimedOut => {
                self.failed += 1;
                self.timed_out += 1;
            }
            ItemOutcome::Errored => {
                self.failed += 1;
                self.errored += 1;
            }
            ItemOutcome::Skipped => self.skipped += 1,
        }
        self.items.push(item);
    }
}

impl BookingEngine {
    /// Executes every booking due at `now`, one at a time, each under the
    /// per-item timeout. Only a failure to list due bookings is an error;
    /// per-item problems are recorded in the report.
    pub async fn run_due_sweep(
        &self,
        now: DateTime<Utc>,
    ) -> Result<BatchRunReport, ApplicationError> {
        let due = self.due_bookings(now).await?;
        info!(
            event_name = "sweep.started",
            total_due = due.len(),
            executed_at = %now,
            "due booking sweep started"
        );

        let mut report = BatchRunReport::new(now, due.len());
        for booking in due {
            let item = self.sweep_item(&booking).await;
            report.push(item);
        }

        info!(
            event_name = "sweep.finished",
            total_due = report.total_due,
            succeeded = report.succeeded,
            failed = report.failed,
            timed_out = report.timed_out,
            errored = report.errored,
            skipped = report.skipped,
            "due booking sweep finished"
        );
        Ok(report)
    }

    async fn sweep_item(&self, booking: &Booking) -> BatchItemReport {
        let mut item = BatchItemReport {
            booking_id: booking.id.clone(),
            outcome: ItemOutcome::Errored,
            date: booking.request.date(),
            time: booking.request.time(),
            error: None,
            confirmation_token: None,
        };

        match self.execute_detailed(&booking.id).await {
            Ok(ExecutionOutcome::Succeeded(done)) => {
                item.outcome = ItemOutcome::Succeeded;
                item.confirmation_token = done.confirmation_token;
            }
            Ok(ExecutionOutcome::Failed(done)) => {
                item.outcome = ItemOutcome::Failed;
                item.error = done.error_detail;
            }
            Ok(ExecutionOutcome::Declined { status, .. }) => {
                item.outcome = ItemOutcome::Skipped;
                item.error = Some(format!("booking was {status} when the sweep reached it"));
            }
            Ok(ExecutionOutcome::TimedOut(_)) => {
                item.outcome = ItemOutcome::TimedOut;
                item.error = Some(format!(
                    "execution exceeded the {}s per-item timeout",
                    self.per_item_timeout.as_secs_f64()
                ));
            }
            Err(error) => {
                warn!(
                    event_name = "sweep.item.errored",
                    booking_id = %booking.id,
                    error = %error,
                    "sweep item errored"
                );
                item.error = Some(error.to_string());
            }
        }

        item
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

    use super::ItemOutcome;
    use crate::backend::{BackendError, MockBackend};
    use crate::domain::booking::{Booking, BookingId, BookingStatus, OwnerId};
    use crate::domain::request::TeeTimeRequest;
    use crate::engine::BookingEngine;
    use crate::notify::RecordingNotifier;
    use crate::scheduler::SchedulingPolicy;
    use crate::store::{BookingFilter, BookingStore, InMemoryBookingStore, StoreError};

    /// Delegates to an in-memory store, except that due listings can be
    /// frozen to an earlier snapshot and reads of one booking can fail.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryBookingStore,
        frozen_due: Mutex<Option<Vec<Booking>>>,
        unreadable: Mutex<Option<BookingId>>,
    }

    impl ScriptedStore {
        fn freeze_due(&self, bookings: Vec<Booking>) {
            *self.frozen_due.lock().expect("lock") = Some(bookings);
        }

        fn make_unreadable(&self, id: &BookingId) {
            *self.unreadable.lock().expect("lock") = Some(id.clone());
        }
    }

    #[async_trait]
    impl BookingStore for ScriptedStore {
        async fn create(&self, booking: Booking) -> Result<(), StoreError> {
            self.inner.create(booking).await
        }

        async fn get(&self, id: &BookingId) -> Result<Option<Booking>, StoreError> {
            if self.unreadable.lock().expect("lock").as_ref() == Some(id) {
                return Err(StoreError::Unavailable("disk I/O error".into()));
            }
            self.inner.get(id).await
        }

        async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
            self.inner.list(filter).await
        }

        async fn compare_and_swap(
            &self,
            booking: &Booking,
            expected: &[BookingStatus],
        ) -> Result<bool, StoreError> {
            self.inner.compare_and_swap(booking, expected).await
        }

        async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
            let frozen = self.frozen_due.lock().expect("lock").clone();
            match frozen {
                Some(bookings) => Ok(bookings),
                None => self.inner.list_due(now).await,
            }
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, d).expect("date")
    }

    fn eight() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 0, 0).expect("time")
    }

    async fn seed(store: &dyn BookingStore, owner: &str, date: NaiveDate) -> Booking {
        let created = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).single().expect("created");
        let request = TeeTimeRequest::new(date, eight(), 2, 30).expect("request");
        let mut booking = Booking::new(OwnerId(owner.into()), request, created);
        booking
            .schedule(Utc.with_ymd_and_hms(2025, 12, 10, 12, 30, 0).single().expect("at"), created)
            .expect("schedule");
        store.create(booking.clone()).await.expect("create");
        booking
    }

    #[tokio::test]
    async fn timed_out_item_is_isolated_from_the_rest() {
        let store = Arc::new(InMemoryBookingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let backend = MockBackend::new().with_date_delay(day(21), Duration::from_millis(500));
        let engine = BookingEngine::new(store.clone(), SchedulingPolicy::default())
            .with_backend(Arc::new(backend))
            .with_notifier(notifier.clone())
            .with_per_item_timeout(Duration::from_millis(100));

        let first = seed(store.as_ref(), "+1001", day(20)).await;
        let slow = seed(store.as_ref(), "+1002", day(21)).await;
        let third = seed(store.as_ref(), "+1003", day(22)).await;

        let now = Utc.with_ymd_and_hms(2025, 12, 10, 13, 0, 0).single().expect("now");
        let report = engine.run_due_sweep(now).await.expect("sweep");

        assert_eq!(report.total_due, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.items.len(), 3);

        let slow_item = report.items.iter().find(|item| item.booking_id == slow.id).expect("slow");
        assert_eq!(slow_item.outcome, ItemOutcome::TimedOut);
        for id in [&first.id, &third.id] {
            let item = report.items.iter().find(|item| &item.booking_id == id).expect("item");
            assert_eq!(item.outcome, ItemOutcome::Succeeded);
            assert!(item.confirmation_token.is_some());
        }

        let stored = store.get(&slow.id).await.expect("get").expect("exists");
        assert_eq!(stored.status, BookingStatus::InProgress);
        let notice = notifier.sent_to(&slow.owner);
        assert_eq!(notice.len(), 1);
        assert!(notice[0].starts_with("Unable to book tee time for Sunday, December 21"));
    }

    #[tokio::test]
    async fn backend_failures_are_reported_per_item() {
        let store = Arc::new(InMemoryBookingStore::default());
        let backend = Arc::new(MockBackend::new());
        backend.fail_discovery_with([BackendError::Unavailable("login failed".into())]);
        let engine = BookingEngine::new(store.clone(), SchedulingPolicy::default())
            .with_backend(backend.clone())
            .with_notifier(Arc::new(RecordingNotifier::default()));

        seed(store.as_ref(), "+1001", day(20)).await;
        seed(store.as_ref(), "+1002", day(20)).await;

        let now = Utc.with_ymd_and_hms(2025, 12, 10, 13, 0, 0).single().expect("now");
        let report = engine.run_due_sweep(now).await.expect("sweep");

        assert_eq!(report.total_due, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failed = report
            .items
            .iter()
            .find(|item| item.outcome == ItemOutcome::Failed)
            .expect("failed item");
        assert_eq!(failed.error.as_deref(), Some("reservation backend unavailable: login failed"));
    }

    #[tokio::test]
    async fn retried_sweep_skips_bookings_already_in_progress() {
        let store = Arc::new(InMemoryBookingStore::default());
        let backend = Arc::new(MockBackend::new());
        let engine = BookingEngine::new(store.clone(), SchedulingPolicy::default())
            .with_backend(backend.clone())
            .with_notifier(Arc::new(RecordingNotifier::default()));
        let mut booking = seed(store.as_ref(), "+1001", day(20)).await;
        booking.transition_to(BookingStatus::InProgress, Utc::now()).expect("claim");
        assert!(store.compare_and_swap(&booking, &BookingStatus::CLAIMABLE).await.expect("cas"));

        let now = Utc.with_ymd_and_hms(2025, 12, 10, 13, 0, 0).single().expect("now");
        let report = engine.run_due_sweep(now).await.expect("sweep");

        assert_eq!(report.total_due, 0);
        assert_eq!(backend.discover_calls(), 0);
    }

    #[tokio::test]
    async fn booking_claimed_after_discovery_is_skipped() {
        let store = Arc::new(ScriptedStore::default());
        let backend = Arc::new(MockBackend::new());
        let engine = BookingEngine::new(store.clone(), SchedulingPolicy::default())
            .with_backend(backend.clone())
            .with_notifier(Arc::new(RecordingNotifier::default()));
        let booking = seed(store.as_ref(), "+1001", day(20)).await;
        store.freeze_due(vec![booking.clone()]);

        let mut claimed = booking.clone();
        claimed.transition_to(BookingStatus::InProgress, Utc::now()).expect("claim");
        assert!(store.compare_and_swap(&claimed, &BookingStatus::CLAIMABLE).await.expect("cas"));

        let now = Utc.with_ymd_and_hms(2025, 12, 10, 13, 0, 0).single().expect("now");
        let report = engine.run_due_sweep(now).await.expect("sweep");

        assert_eq!(report.total_due, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.items[0].outcome, ItemOutcome::Skipped);
        assert_eq!(backend.discover_calls(), 0);
        let stored = store.get(&booking.id).await.expect("get").expect("exists");
        assert_eq!(stored.status, BookingStatus::InProgress);
    }

    #[tokio::test]
    async fn unreadable_booking_is_errored_and_the_rest_still_run() {
        let store = Arc::new(ScriptedStore::default());
        let engine = BookingEngine::new(store.clone(), SchedulingPolicy::default())
            .with_backend(Arc::new(MockBackend::new()))
            .with_notifier(Arc::new(RecordingNotifier::default()));
        let first = seed(store.as_ref(), "+1001", day(20)).await;
        let broken = seed(store.as_ref(), "+1002", day(21)).await;
        let third = seed(store.as_ref(), "+1003", day(22)).await;
        store.make_unreadable(&broken.id);

        let now = Utc.with_ymd_and_hms(2025, 12, 10, 13, 0, 0).single().expect("now");
        let report = engine.run_due_sweep(now).await.expect("sweep");

        assert_eq!(report.total_due, 3);
        assert_eq!(report.errored, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 2);
        let errored = report.items.iter().find(|item| item.booking_id == broken.id).expect("item");
        assert_eq!(errored.outcome, ItemOutcome::Errored);
        assert!(errored.error.as_deref().is_some_and(|error| error.contains("disk I/O error")));
        for id in [&first.id, &third.id] {
            let stored = store.get(id).await.expect("get").expect("exists");
            assert_eq!(stored.status, BookingStatus::Success);
        }
    }

    #[test]
    fn report_serializes_with_snake_case_outcomes() {
        assert_eq!(
            serde_json::to_string(&ItemOutcome::TimedOut).expect("serialize"),
            "\"timed_out\""
        );
        assert_eq!(ItemOutcome::TimedOut.as_str(), "timed_out");
    }
}
