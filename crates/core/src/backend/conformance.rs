//! Contract checks every [`ReservationBackend`] must pass.
//!
//! The checks reserve and cancel real slots, so point them at a sandbox date
//! with at least two open slots.

use chrono::{NaiveDate, NaiveTime, Timelike};
use thiserror::Error;

use super::ReservationBackend;
use crate::domain::slot::{ReservationOutcome, SlotCandidate};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("conformance check `{check}` failed: {detail}")]
pub struct ConformanceFailure {
    pub check: &'static str,
    pub detail: String,
}

impl ConformanceFailure {
    fn new(check: &'static str, detail: impl Into<String>) -> Self {
        Self { check, detail: detail.into() }
    }
}

pub async fn run_all<B>(backend: &B, date: NaiveDate) -> Result<(), ConformanceFailure>
where
    B: ReservationBackend + ?Sized,
{
    selection_prefers_nearest_slot(backend)?;
    discovery_is_ascending(backend, date).await?;
    exact_slot_is_booked(backend, date).await?;
    unmatched_time_is_rejected_with_alternatives(backend, date).await?;
    Ok(())
}

pub fn selection_prefers_nearest_slot<B>(backend: &B) -> Result<(), ConformanceFailure>
where
    B: ReservationBackend + ?Sized,
{
    const CHECK: &str = "selection_prefers_nearest_slot";
    let candidates = [
        SlotCandidate::new(time(7, 30), "a"),
        SlotCandidate::new(time(7, 46), "b"),
        SlotCandidate::new(time(8, 8), "c"),
    ];

    match backend.select_best_match(&candidates, time(8, 0), 30) {
        Some(picked) if picked.time == time(8, 8) => {}
        other => {
            return Err(ConformanceFailure::new(CHECK, format!("expected 08:08, picked {other:?}")))
        }
    }

    let far = [SlotCandidate::new(time(7, 30), "a"), SlotCandidate::new(time(8, 10), "b")];
    if let Some(picked) = backend.select_best_match(&far, time(8, 0), 5) {
        return Err(ConformanceFailure::new(CHECK, format!("expected no match, picked {picked:?}")));
    }

    let tied = [SlotCandidate::new(time(7, 50), "a"), SlotCandidate::new(time(8, 10), "b")];
    match backend.select_best_match(&tied, time(8, 0), 10) {
        Some(picked) if picked.time == time(7, 50) => Ok(()),
        other => Err(ConformanceFailure::new(CHECK, format!("tie should pick 07:50, got {other:?}"))),
    }
}

pub async fn discovery_is_ascending<B>(backend: &B, date: NaiveDate) -> Result<(), ConformanceFailure>
where
    B: ReservationBackend + ?Sized,
{
    const CHECK: &str = "discovery_is_ascending";
    let slots = discover(backend, date, CHECK).await?;
    if slots.windows(2).any(|pair| pair[0].time > pair[1].time) {
        return Err(ConformanceFailure::new(CHECK, "slots are not sorted by time of day"));
    }
    Ok(())
}

pub async fn exact_slot_is_booked<B>(backend: &B, date: NaiveDate) -> Result<(), ConformanceFailure>
where
    B: ReservationBackend + ?Sized,
{
    const CHECK: &str = "exact_slot_is_booked";
    let slots = discover(backend, date, CHECK).await?;
    let Some(first) = slots.first() else {
        return Err(ConformanceFailure::new(CHECK, format!("no open slots on {date}")));
    };

    let outcome = backend
        .book_tee_time(date, first.time, 1, 0)
        .await
        .map_err(|error| ConformanceFailure::new(CHECK, error.to_string()))?;
    let ReservationOutcome::Booked { booked_time, confirmation_token } = outcome else {
        return Err(ConformanceFailure::new(CHECK, format!("expected booking, got {outcome:?}")));
    };
    if booked_time != first.time {
        return Err(ConformanceFailure::new(
            CHECK,
            format!("asked for {} with zero window, booked {booked_time}", first.time),
        ));
    }

    let remaining = discover(backend, date, CHECK).await?;
    if remaining.iter().any(|slot| slot.time == booked_time) {
        return Err(ConformanceFailure::new(CHECK, "booked slot is still reported as open"));
    }

    if let Some(token) = confirmation_token {
        let cancelled = backend
            .cancel_reservation(&token)
            .await
            .map_err(|error| ConformanceFailure::new(CHECK, error.to_string()))?;
        if !cancelled {
            return Err(ConformanceFailure::new(CHECK, format!("could not cancel {token}")));
        }
    }
    Ok(())
}

pub async fn unmatched_time_is_rejected_with_alternatives<B>(
    backend: &B,
    date: NaiveDate,
) -> Result<(), ConformanceFailure>
where
    B: ReservationBackend + ?Sized,
{
    const CHECK: &str = "unmatched_time_is_rejected_with_alternatives";
    let slots = discover(backend, date, CHECK).await?;
    if slots.is_empty() {
        return Err(ConformanceFailure::new(CHECK, format!("no open slots on {date}")));
    }

    let Some(free_minute) = (0..24 * 60)
        .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
        .find(|candidate| {
            slots.iter().all(|slot| {
                slot.time.hour() != candidate.hour() || slot.time.minute() != candidate.minute()
            })
        })
    else {
        return Err(ConformanceFailure::new(CHECK, "every minute of the day is open"));
    };

    let outcome = backend
        .book_tee_time(date, free_minute, 1, 0)
        .await
        .map_err(|error| ConformanceFailure::new(CHECK, error.to_string()))?;
    match outcome {
        ReservationOutcome::Rejected { alternatives_hint: Some(hint), .. } if !hint.is_empty() => {
            Ok(())
        }
        other => Err(ConformanceFailure::new(
            CHECK,
            format!("expected rejection with alternatives, got {other:?}"),
        )),
    }
}

async fn discover<B>(
    backend: &B,
    date: NaiveDate,
    check: &'static str,
) -> Result<Vec<SlotCandidate>, ConformanceFailure>
where
    B: ReservationBackend + ?Sized,
{
    backend.discover_slots(date).await.map_err(|error| ConformanceFailure::new(check, error.to_string()))
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
