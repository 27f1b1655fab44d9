use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use super::{BackendError, ReservationBackend};
use crate::domain::slot::SlotCandidate;

const DEFAULT_FIRST_TEE: (u32, u32) = (7, 0);
const DEFAULT_INTERVAL_MINUTES: u32 = 10;
const DEFAULT_SLOT_COUNT: u32 = 20;

/// Deterministic in-process tee sheet.
///
/// Dates without an explicit sheet get slots every ten minutes from 07:00.
/// Committing a slot removes it, so a second reservation of the same time on
/// the same date falls back to the next nearest slot.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    discover_calls: AtomicUsize,
    commit_calls: AtomicUsize,
}

#[derive(Default)]
struct MockState {
    sheets: HashMap<NaiveDate, Vec<NaiveTime>>,
    discovery_failures: VecDeque<BackendError>,
    commit_failures: VecDeque<BackendError>,
    delay: Option<Duration>,
    date_delays: HashMap<NaiveDate, Duration>,
    reservations: HashMap<String, (NaiveDate, NaiveTime)>,
    next_sequence: u32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tee sheet for `date`.
    pub fn with_slots(self, date: NaiveDate, times: &[NaiveTime]) -> Self {
        self.lock().sheets.insert(date, times.to_vec());
        self
    }

    /// Delay applied to every discovery call.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    /// Delay applied to discovery for one date only.
    pub fn with_date_delay(self, date: NaiveDate, delay: Duration) -> Self {
        self.lock().date_delays.insert(date, delay);
        self
    }

    /// Queues errors returned by the next discovery calls, one per call.
    pub fn fail_discovery_with(&self, errors: impl IntoIterator<Item = BackendError>) {
        self.lock().discovery_failures.extend(errors);
    }

    /// Queues errors returned by the next commit calls, one per call.
    pub fn fail_commit_with(&self, errors: impl IntoIterator<Item = BackendError>) {
        self.lock().commit_failures.extend(errors);
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn reservation(&self, confirmation_token: &str) -> Option<(NaiveDate, NaiveTime)> {
        self.lock().reservations.get(confirmation_token).copied()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MockState {
    fn sheet_mut(&mut self, date: NaiveDate) -> &mut Vec<NaiveTime> {
        self.sheets.entry(date).or_insert_with(default_sheet)
    }
}

fn default_sheet() -> Vec<NaiveTime> {
    let (hour, minute) = DEFAULT_FIRST_TEE;
    let first = hour * 60 + minute;
    (0..DEFAULT_SLOT_COUNT)
        .filter_map(|index| {
            let minutes = first + index * DEFAULT_INTERVAL_MINUTES;
            NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        })
        .collect()
}

#[async_trait]
impl ReservationBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn discover_slots(&self, date: NaiveDate) -> Result<Vec<SlotCandidate>, BackendError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);

        let delay = {
            let state = self.lock();
            state.date_delays.get(&date).copied().or(state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(error) = state.discovery_failures.pop_front() {
            return Err(error);
        }

        let mut times = state.sheet_mut(date).clone();
        times.sort();
        Ok(times
            .into_iter()
            .map(|time| SlotCandidate::new(time, format!("{date}T{}", time.format("%H:%M"))))
            .collect())
    }

    async fn commit_slot(
        &self,
        date: NaiveDate,
        slot: &SlotCandidate,
        _party_size: u8,
    ) -> Result<Option<String>, BackendError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.lock();
        if let Some(error) = state.commit_failures.pop_front() {
            return Err(error);
        }

        let sheet = state.sheet_mut(date);
        let Some(position) = sheet.iter().position(|time| *time == slot.time) else {
            return Err(BackendError::Site(format!(
                "slot {} on {date} is no longer available",
                slot.time.format("%I:%M %p")
            )));
        };
        sheet.remove(position);

        state.next_sequence += 1;
        let token = format!("MOCK-{}-{:04}", date.format("%Y%m%d"), state.next_sequence);
        state.reservations.insert(token.clone(), (date, slot.time));
        Ok(Some(token))
    }

    async fn cancel_reservation(&self, confirmation_token: &str) -> Result<bool, BackendError> {
        let mut state = self.lock();
        let Some((date, time)) = state.reservations.remove(confirmation_token) else {
            return Ok(false);
        };

        let sheet = state.sheet_mut(date);
        sheet.push(time);
        sheet.sort();
        Ok(true)
    }
}
