use tracing::{info, warn};

use super::BookingEngine;
use crate::domain::booking::{Booking, BookingId, BookingStatus};
use crate::domain::slot::ReservationOutcome;
use crate::errors::ApplicationError;
use crate::messages;

const BACKEND_NOT_CONFIGURED_DETAIL: &str = "Reservation backend not configured";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded(Booking),
    Failed(Booking),
    /// The booking was not claimable, typically because another caller
    /// already moved it to `in_progress`. The backend was not called.
    Declined { id: BookingId, status: BookingStatus },
    /// The per-item deadline fired. Carries the booking as stored afterwards,
    /// normally still `in_progress`.
    TimedOut(Booking),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

impl BookingEngine {
    /// Runs one booking through the reservation backend. Returns `true` only
    /// when a slot was reserved; every other outcome is `false`.
    pub async fn execute(&self, id: &BookingId) -> bool {
        match self.execute_detailed(id).await {
            Ok(outcome) => outcome.is_success(),
            Err(error) => {
                warn!(
                    event_name = "booking.execute.error",
                    booking_id = %id,
                    error = %error,
                    "booking execution aborted"
                );
                false
            }
        }
    }

    /// Claims the booking with an atomic `pending|scheduled -> in_progress`
    /// swap, calls the backend exactly once and records the terminal outcome,
    /// all within the per-item timeout.
    ///
    /// Backend failures end in `Ok(Failed)`; `Err` is reserved for unknown
    /// ids and store failures.
    pub async fn execute_detailed(
        &self,
        id: &BookingId,
    ) -> Result<ExecutionOutcome, ApplicationError> {
        let booking = self.get_booking(id).await?;
        let attempt = self.execute_loaded(booking.clone());
        match tokio::time::timeout(self.per_item_timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => {
                warn!(
                    event_name = "booking.execute.timed_out",
                    booking_id = %id,
                    timeout_secs = self.per_item_timeout.as_secs_f64(),
                    "booking execution exceeded per-item timeout"
                );
                let details = messages::booking_details(&booking.request, booking.request.time());
                let body =
                    messages::failure_notice(messages::EXECUTION_TIMED_OUT, None, Some(&details));
                self.notify(&booking, &body).await;
                Ok(ExecutionOutcome::TimedOut(self.get_booking(id).await?))
            }
        }
    }

    async fn execute_loaded(&self, booking: Booking) -> Result<ExecutionOutcome, ApplicationError> {
        let id = booking.id.clone();

        let Some(backend) = self.backend.clone() else {
            return self.fail_unconfigured(booking).await;
        };

        if !BookingStatus::CLAIMABLE.contains(&booking.status) {
            return Ok(ExecutionOutcome::Declined { id: booking.id, status: booking.status });
        }

        let mut claimed = booking;
        claimed.transition_to(BookingStatus::InProgress, self.clock.now())?;
        if !self.store.compare_and_swap(&claimed, &BookingStatus::CLAIMABLE).await? {
            let current = self.get_booking(&id).await?;
            info!(
                event_name = "booking.execute.declined",
                booking_id = %id,
                status = %current.status,
                "booking already claimed"
            );
            return Ok(ExecutionOutcome::Declined { id: current.id, status: current.status });
        }
        info!(
            event_name = "booking.execute.claimed",
            booking_id = %id,
            backend = backend.name(),
            "booking claimed for execution"
        );

        let request = claimed.request.clone();
        let result = backend
            .book_tee_time(
                request.date(),
                request.time(),
                request.party_size(),
                request.fallback_window_minutes(),
            )
            .await;

        let now = self.clock.now();
        match result {
            Ok(ReservationOutcome::Booked { booked_time, confirmation_token }) => {
                claimed.record_success(booked_time, confirmation_token, now)?;
                self.persist_outcome(&claimed).await?;
                info!(
                    event_name = "booking.execute.succeeded",
                    booking_id = %id,
                    booked_time = %booked_time,
                    "tee time reserved"
                );

                let details = messages::booking_details(&request, booked_time);
                let body =
                    messages::confirmation_notice(&details, claimed.confirmation_token.as_deref());
                self.notify(&claimed, &body).await;
                Ok(ExecutionOutcome::Succeeded(claimed))
            }
            Ok(ReservationOutcome::Rejected { error_message, alternatives_hint }) => {
                self.record_failed(claimed, error_message, alternatives_hint).await
            }
            Err(error) => self.record_failed(claimed, error.to_string(), None).await,
        }
    }

    async fn record_failed(
        &self,
        mut booking: Booking,
        reason: String,
        alternatives_hint: Option<String>,
    ) -> Result<ExecutionOutcome, ApplicationError> {
        booking.record_failure(reason.clone(), alternatives_hint.clone(), self.clock.now())?;
        self.persist_outcome(&booking).await?;
        warn!(
            event_name = "booking.execute.failed",
            booking_id = %booking.id,
            reason = %reason,
            "reservation attempt failed"
        );

        let body = messages::failure_notice(&reason, alternatives_hint.as_deref(), None);
        self.notify(&booking, &body).await;
        Ok(ExecutionOutcome::Failed(booking))
    }

    async fn fail_unconfigured(
        &self,
        mut booking: Booking,
    ) -> Result<ExecutionOutcome, ApplicationError> {
        if !BookingStatus::CLAIMABLE.contains(&booking.status) {
            return Ok(ExecutionOutcome::Declined { id: booking.id, status: booking.status });
        }

        booking.record_failure(BACKEND_NOT_CONFIGURED_DETAIL, None, self.clock.now())?;
        if !self.store.compare_and_swap(&booking, &BookingStatus::CLAIMABLE).await? {
            let current = self.get_booking(&booking.id).await?;
            return Ok(ExecutionOutcome::Declined { id: current.id, status: current.status });
        }
        warn!(
            event_name = "booking.execute.unconfigured",
            booking_id = %booking.id,
            "no reservation backend configured"
        );

        let body = messages::failure_notice(messages::BACKEND_NOT_CONFIGURED, None, None);
        self.notify(&booking, &body).await;
        Ok(ExecutionOutcome::Failed(booking))
    }

    async fn persist_outcome(&self, booking: &Booking) -> Result<(), ApplicationError> {
        if !self.store.compare_and_swap(booking, &[BookingStatus::InProgress]).await? {
            warn!(
                event_name = "booking.execute.outcome_dropped",
                booking_id = %booking.id,
                status = %booking.status,
                "booking left in_progress before its outcome was recorded"
            );
        }
        Ok(())
    }

    pub(crate) async fn notify(&self, booking: &Booking, body: &str) {
        if let Err(error) = self.notifier.deliver(&booking.owner, body).await {
            warn!(
                event_name = "notify.failed",
                booking_id = %booking.id,
                owner = %booking.owner,
                error = %error,
                "notification delivery failed"
            );
        }
    }
}
