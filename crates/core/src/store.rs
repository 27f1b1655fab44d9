//! Storage ports for bookings and conversation sessions.
//!
//! The durable adapter lives in `teetime-db`; the in-memory versions here back
//! unit tests and the `disabled` database mode of local tooling.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::booking::{Booking, BookingId, BookingStatus, OwnerId};
use crate::domain::session::ConversationSession;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
    #[error("record already exists: {0}")]
    Conflict(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub owner: Option<OwnerId>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn for_owner(owner: OwnerId) -> Self {
        Self { owner: Some(owner), status: None }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.owner.as_ref().map_or(true, |owner| &booking.owner == owner)
            && self.status.map_or(true, |status| booking.status == status)
    }
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create(&self, booking: Booking) -> Result<(), StoreError>;

    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, StoreError>;

    /// Matching bookings ordered by requested date, requested time, then creation.
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError>;

    /// Writes `booking` only if the stored status is one of `expected`.
    ///
    /// Returns `false` without writing when the status has moved on. This is
    /// the single atomic check-and-set every lifecycle transition goes through.
    async fn compare_and_swap(
        &self,
        booking: &Booking,
        expected: &[BookingStatus],
    ) -> Result<bool, StoreError>;

    /// Scheduled bookings whose execution instant is at or before `now`.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, owner: &OwnerId) -> Result<Option<ConversationSession>, StoreError>;
    async fn save(&self, session: &ConversationSession) -> Result<(), StoreError>;
}

pub(crate) fn sort_for_listing(bookings: &mut [Booking]) {
    bookings.sort_by(|left, right| {
        left.request
            .date()
            .cmp(&right.request.date())
            .then_with(|| left.request.time().cmp(&right.request.time()))
            .then_with(|| left.created_at.cmp(&right.created_at))
    });
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: RwLock<HashMap<String, Booking>>,
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn create(&self, booking: Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id.0) {
            return Err(StoreError::Conflict(booking.id.0));
        }
        bookings.insert(booking.id.0.clone(), booking);
        Ok(())
    }

    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id.0).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        let mut matching: Vec<Booking> =
            bookings.values().filter(|booking| filter.matches(booking)).cloned().collect();
        sort_for_listing(&mut matching);
        Ok(matching)
    }

    async fn compare_and_swap(
        &self,
        booking: &Booking,
        expected: &[BookingStatus],
    ) -> Result<bool, StoreError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id.0) {
            Some(stored) if expected.contains(&stored.status) => {
                *stored = booking.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().filter(|booking| booking.is_due(now)).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationSession>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, owner: &OwnerId) -> Result<Option<ConversationSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&owner.0).cloned())
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.owner.0.clone(), session.clone());
        Ok(())
    }
}
