//! The booking orchestration context.
//!
//! [`BookingEngine`] owns the booking lifecycle: creation and scheduling,
//! cancellation, single-booking execution and the due sweep. All collaborators
//! are injected, so several engines can run side by side in tests.

mod executor;
mod sweep;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::backend::ReservationBackend;
use crate::clock::{Clock, SystemClock};
use crate::domain::booking::{Booking, BookingId, BookingStatus, OwnerId};
use crate::domain::request::TeeTimeRequest;
use crate::errors::ApplicationError;
use crate::notify::{Notifier, TracingNotifier};
use crate::scheduler::{check_guest_lead_time, ExecutionScheduler, SchedulingPolicy};
use crate::store::{BookingFilter, BookingStore};

pub use executor::ExecutionOutcome;
pub use sweep::{BatchItemReport, BatchRunReport, ItemOutcome};

pub const DEFAULT_PER_ITEM_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn BookingStore>,
    scheduler: ExecutionScheduler,
    backend: Option<Arc<dyn ReservationBackend>>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    per_item_timeout: Duration,
}

impl BookingEngine {
    /// An engine with no reservation backend, log-only notifications and the
    /// system clock. Use the `with_*` methods to replace collaborators.
    pub fn new(store: Arc<dyn BookingStore>, policy: SchedulingPolicy) -> Self {
        Self {
            scheduler: ExecutionScheduler::new(policy, store.clone()),
            store,
            backend: None,
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            per_item_timeout: DEFAULT_PER_ITEM_TIMEOUT,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ReservationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_per_item_timeout(mut self, timeout: Duration) -> Self {
        self.per_item_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        self.scheduler.policy()
    }

    pub fn timezone(&self) -> Tz {
        self.policy().window.timezone
    }

    pub fn scheduler(&self) -> &ExecutionScheduler {
        &self.scheduler
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Creates a booking and schedules it for the opening of its booking
    /// window. When the window is already open and immediate execution is
    /// enabled, the executor runs before this returns and the returned
    /// booking carries the outcome.
    pub async fn create_booking(
        &self,
        owner: OwnerId,
        request: TeeTimeRequest,
    ) -> Result<Booking, ApplicationError> {
        let now = self.clock.now();
        check_guest_lead_time(&request, now, self.policy())?;

        let execution_at = self.scheduler.execution_instant(request.date())?;
        let mut booking = Booking::new(owner, request, now);
        booking.schedule(execution_at, now)?;
        self.store.create(booking.clone()).await?;

        info!(
            event_name = "booking.created",
            booking_id = %booking.id,
            owner = %booking.owner,
            execution_at = %execution_at,
            "booking scheduled"
        );

        if self.policy().execute_when_window_open && execution_at <= now {
            info!(
                event_name = "booking.execute.immediate",
                booking_id = %booking.id,
                "booking window already open, executing now"
            );
            self.execute(&booking.id).await;
            return self.get_booking(&booking.id).await;
        }

        Ok(booking)
    }

    pub async fn get_booking(&self, id: &BookingId) -> Result<Booking, ApplicationError> {
        self.store.get(id).await?.ok_or_else(|| ApplicationError::NotFound(id.clone()))
    }

    pub async fn list_bookings(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, ApplicationError> {
        Ok(self.store.list(filter).await?)
    }

    /// Owner's bookings that are not yet in a terminal state.
    pub async fn active_bookings(&self, owner: &OwnerId) -> Result<Vec<Booking>, ApplicationError> {
        let mut bookings = self.list_bookings(&BookingFilter::for_owner(owner.clone())).await?;
        bookings.retain(|booking| !booking.status.is_terminal());
        Ok(bookings)
    }

    pub async fn cancellable_bookings(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<Booking>, ApplicationError> {
        let mut bookings = self.list_bookings(&BookingFilter::for_owner(owner.clone())).await?;
        bookings.retain(|booking| booking.status.is_cancellable());
        Ok(bookings)
    }

    /// Moves a pending or scheduled booking to `cancelled`. Any other status
    /// is a state conflict and leaves the booking untouched.
    pub async fn cancel_booking(&self, id: &BookingId) -> Result<Booking, ApplicationError> {
        let booking = self.get_booking(id).await?;
        self.cancel_loaded(booking).await
    }

    /// Same as [`BookingEngine::cancel_booking`] but only for the booking's owner.
    pub async fn cancel_booking_for_owner(
        &self,
        id: &BookingId,
        owner: &OwnerId,
    ) -> Result<Booking, ApplicationError> {
        let booking = self.get_booking(id).await?;
        if &booking.owner != owner {
            return Err(ApplicationError::OwnerMismatch(id.clone()));
        }
        self.cancel_loaded(booking).await
    }

    async fn cancel_loaded(&self, mut booking: Booking) -> Result<Booking, ApplicationError> {
        let conflict = |booking: &Booking| ApplicationError::StateConflict {
            id: booking.id.clone(),
            status: booking.status,
            action: "cancelled",
        };

        if !booking.status.is_cancellable() {
            return Err(conflict(&booking));
        }

        booking.transition_to(BookingStatus::Cancelled, self.clock.now())?;
        if !self.store.compare_and_swap(&booking, &BookingStatus::CLAIMABLE).await? {
            let current = self.get_booking(&booking.id).await?;
            return Err(conflict(&current));
        }

        info!(
            event_name = "booking.cancelled",
            booking_id = %booking.id,
            owner = %booking.owner,
            "booking cancelled"
        );
        Ok(booking)
    }

    pub async fn due_bookings(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, ApplicationError> {
        Ok(self.scheduler.due_bookings(now).await?)
    }
}
