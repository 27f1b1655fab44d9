//! The reservation backend contract.
//!
//! A backend supplies discovery and a commit step; selection, single-booking
//! composition and batch booking have default implementations so every
//! backend resolves slots the same way.

pub mod conformance;
pub mod mock;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::clock::Clock;
use crate::domain::slot::{BatchItemResult, BatchSlotRequest, ReservationOutcome, SlotCandidate};
use crate::slots;

pub use mock::MockBackend;
pub use retry::{RetryPolicy, RetryingBackend};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Worth another attempt: network blip, session expired, page not ready.
    #[error("transient backend failure: {0}")]
    Transient(String),
    /// The club site answered but refused or broke.
    #[error("reservation site error: {0}")]
    Site(String),
    #[error("reservation backend unavailable: {0}")]
    Unavailable(String),
    #[error("reservation attempt cancelled")]
    Cancelled,
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[async_trait]
pub trait ReservationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Genuinely reservable slots for `date`, ascending by time of day.
    async fn discover_slots(&self, date: NaiveDate) -> Result<Vec<SlotCandidate>, BackendError>;

    /// Reserves one discovered slot. Returns the club's confirmation token if
    /// it issued one.
    async fn commit_slot(
        &self,
        date: NaiveDate,
        slot: &SlotCandidate,
        party_size: u8,
    ) -> Result<Option<String>, BackendError>;

    async fn cancel_reservation(&self, confirmation_token: &str) -> Result<bool, BackendError>;

    fn select_best_match<'a>(
        &self,
        candidates: &'a [SlotCandidate],
        requested: NaiveTime,
        fallback_window_minutes: u32,
    ) -> Option<&'a SlotCandidate> {
        slots::select_best_match(candidates, requested, fallback_window_minutes)
    }

    /// Discovery, selection and one commit. Not idempotent: the caller is
    /// responsible for invoking it at most once per logical attempt.
    async fn book_tee_time(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        party_size: u8,
        fallback_window_minutes: u32,
    ) -> Result<ReservationOutcome, BackendError> {
        let mut candidates = self.discover_slots(date).await?;
        candidates.sort_by_key(|candidate| candidate.time);

        let Some(slot) = self.select_best_match(&candidates, time, fallback_window_minutes).cloned()
        else {
            return Ok(ReservationOutcome::Rejected {
                error_message: no_match_message(time, fallback_window_minutes),
                alternatives_hint: slots::alternatives_hint(&candidates),
            });
        };

        let confirmation_token = self.commit_slot(date, &slot, party_size).await?;
        Ok(ReservationOutcome::Booked { booked_time: slot.time, confirmation_token })
    }

    /// Books several parties on one date in submission order. Nothing is
    /// committed before `not_before`, measured against `clock`; an item's
    /// error becomes that item's rejection and the rest continue.
    async fn book_multiple(
        &self,
        date: NaiveDate,
        requests: &[BatchSlotRequest],
        not_before: Option<DateTime<Utc>>,
        clock: &dyn Clock,
    ) -> Vec<BatchItemResult> {
        if let Some(not_before) = not_before {
            if let Ok(wait) = (not_before - clock.now()).to_std() {
                tracing::debug!(
                    event_name = "backend.batch.waiting",
                    backend = self.name(),
                    wait_ms = wait.as_millis() as u64,
                    "waiting for booking window before committing batch"
                );
                tokio::time::sleep(wait).await;
            }
        }

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let outcome = match self
                .book_tee_time(date, request.time, request.party_size, request.fallback_window_minutes)
                .await
            {
                Ok(outcome) => outcome,
                Err(error) => ReservationOutcome::rejected(error.to_string()),
            };
            results.push(BatchItemResult { key: request.key.clone(), outcome });
        }
        results
    }
}

pub(crate) fn no_match_message(requested: NaiveTime, fallback_window_minutes: u32) -> String {
    format!(
        "No tee times available within {fallback_window_minutes} minutes of {}",
        requested.format("%I:%M %p")
    )
}
