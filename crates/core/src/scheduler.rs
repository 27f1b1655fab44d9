//! Booking-window arithmetic and due-booking discovery.
//!
//! [`compute_execution_instant`] is pure: the same target date and policy
//! always produce the same instant, regardless of when it is called.

use std::sync::Arc;

use chrono::{
    DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use thiserror::Error;

use crate::domain::booking::Booking;
use crate::domain::request::TeeTimeRequest;
use crate::errors::DomainError;
use crate::store::{BookingStore, StoreError};

/// When the club opens reservations for a given play date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingWindowPolicy {
    pub days_in_advance: u32,
    pub open_hour: u32,
    pub open_minute: u32,
    pub timezone: Tz,
}

impl Default for BookingWindowPolicy {
    fn default() -> Self {
        Self {
            days_in_advance: 7,
            open_hour: 6,
            open_minute: 30,
            timezone: chrono_tz::America::Chicago,
        }
    }
}

/// Creation-time rules layered on top of the booking window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulingPolicy {
    pub window: BookingWindowPolicy,
    /// Parties larger than one cannot be booked closer than this to tee time.
    pub guest_lead_hours: Option<u32>,
    /// Run the executor inline when the window is already open at creation.
    pub execute_when_window_open: bool,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            window: BookingWindowPolicy::default(),
            guest_lead_hours: Some(48),
            execute_when_window_open: true,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("target date {0} is too early to subtract the booking window")]
    DateOutOfRange(NaiveDate),
    #[error("booking window open time {hour:02}:{minute:02} is not a valid time of day")]
    InvalidOpenTime { hour: u32, minute: u32 },
    #[error("local time {local} does not exist in {timezone}")]
    NonexistentLocalTime { local: NaiveDateTime, timezone: String },
}

/// `(target_date - days_in_advance) at open_hour:open_minute` in the club
/// timezone, expressed in UTC. An ambiguous local time (DST fall-back)
/// resolves to its earlier occurrence.
pub fn compute_execution_instant(
    target_date: NaiveDate,
    policy: &BookingWindowPolicy,
) -> Result<DateTime<Utc>, SchedulingError> {
    let open_date = target_date
        .checked_sub_days(Days::new(u64::from(policy.days_in_advance)))
        .ok_or(SchedulingError::DateOutOfRange(target_date))?;
    let local = open_date.and_hms_opt(policy.open_hour, policy.open_minute, 0).ok_or(
        SchedulingError::InvalidOpenTime { hour: policy.open_hour, minute: policy.open_minute },
    )?;

    localize(local, policy.timezone)
}

fn localize(local: NaiveDateTime, timezone: Tz) -> Result<DateTime<Utc>, SchedulingError> {
    match timezone.from_local_datetime(&local) {
        LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
            Ok(instant.with_timezone(&Utc))
        }
        LocalResult::None => Err(SchedulingError::NonexistentLocalTime {
            local,
            timezone: timezone.name().to_string(),
        }),
    }
}

/// Like [`localize`], but a wall time inside a spring-forward gap resolves to
/// the later instant, read with the offset in force before the gap.
fn localize_forward(local: NaiveDateTime, timezone: Tz) -> DateTime<Utc> {
    match timezone.from_local_datetime(&local) {
        LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
            instant.with_timezone(&Utc)
        }
        LocalResult::None => {
            let offset_secs = timezone
                .offset_from_local_datetime(&(local - Duration::days(1)))
                .earliest()
                .map_or(0, |offset| offset.fix().local_minus_utc());
            Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset_secs))))
        }
    }
}

/// Rejects multi-player requests whose tee time is closer than the configured
/// lead time, measured in the club timezone.
pub fn check_guest_lead_time(
    request: &TeeTimeRequest,
    now: DateTime<Utc>,
    policy: &SchedulingPolicy,
) -> Result<(), DomainError> {
    let Some(lead_hours) = policy.guest_lead_hours else {
        return Ok(());
    };
    if request.party_size() <= 1 {
        return Ok(());
    }

    let tee_time =
        localize_forward(request.date().and_time(request.time()), policy.window.timezone);

    if tee_time - now < Duration::hours(i64::from(lead_hours)) {
        return Err(DomainError::InvalidRequest(format!(
            "Multi-player bookings ({} players) cannot be made within {lead_hours} hours of the \
             tee time. You can still book for 1 player, or choose a tee time more than \
             {lead_hours} hours away.",
            request.party_size()
        )));
    }

    Ok(())
}

/// Computes execution instants and reports which bookings are due.
#[derive(Clone)]
pub struct ExecutionScheduler {
    policy: SchedulingPolicy,
    store: Arc<dyn BookingStore>,
}

impl ExecutionScheduler {
    pub fn new(policy: SchedulingPolicy, store: Arc<dyn BookingStore>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    pub fn execution_instant(&self, target_date: NaiveDate) -> Result<DateTime<Utc>, SchedulingError> {
        compute_execution_instant(target_date, &self.policy.window)
    }

    /// Bookings in `scheduled` status whose instant is at or before `now`.
    /// In-progress bookings are excluded by the status filter, which is what
    /// keeps a retried sweep from submitting them a second time.
    pub async fn due_bookings(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        let mut due = self.store.list_due(now).await?;
        due.retain(|booking| booking.is_due(now));
        due.sort_by(|left, right| {
            left.scheduled_execution_at
                .cmp(&right.scheduled_execution_at)
                .then_with(|| left.created_at.cmp(&right.created_at))
        });
        Ok(due)
    }
}
