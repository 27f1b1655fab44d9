use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::TeeTimeRequest;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl BookingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner key of a booking or conversation, normally the sender's phone number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Scheduled,
    InProgress,
    Success,
    Failed,
    Cancelled,
}

impl BookingStatus {
    pub const CLAIMABLE: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Scheduled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The record of one reservation attempt through its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub owner: OwnerId,
    pub request: TeeTimeRequest,
    pub status: BookingStatus,
    pub scheduled_execution_at: Option<DateTime<Utc>>,
    pub actual_booked_time: Option<NaiveTime>,
    pub confirmation_token: Option<String>,
    pub error_detail: Option<String>,
    pub alternatives_hint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(owner: OwnerId, request: TeeTimeRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: BookingId::generate(),
            owner,
            request,
            status: BookingStatus::Pending,
            scheduled_execution_at: None,
            actual_booked_time: None,
            confirmation_token: None,
            error_detail: None,
            alternatives_hint: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::{Cancelled, Failed, InProgress, Pending, Scheduled, Success};

        matches!(
            (self.status, next),
            (Pending, Scheduled)
                | (Pending | Scheduled, InProgress)
                | (Pending | Scheduled, Cancelled)
                | (Pending | Scheduled, Failed)
                | (InProgress, Success)
                | (InProgress, Failed)
        )
    }

    pub fn transition_to(
        &mut self,
        next: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidBookingTransition { from: self.status, to: next });
        }

        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn schedule(
        &mut self,
        execution_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition_to(BookingStatus::Scheduled, now)?;
        self.scheduled_execution_at = Some(execution_at);
        Ok(())
    }

    pub fn record_success(
        &mut self,
        booked_time: NaiveTime,
        confirmation_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition_to(BookingStatus::Success, now)?;
        self.actual_booked_time = Some(booked_time);
        self.confirmation_token = confirmation_token;
        self.error_detail = None;
        Ok(())
    }

    pub fn record_failure(
        &mut self,
        error_detail: impl Into<String>,
        alternatives_hint: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition_to(BookingStatus::Failed, now)?;
        self.error_detail = Some(error_detail.into());
        self.alternatives_hint = alternatives_hint;
        Ok(())
    }

    /// True when the booking is scheduled and its execution instant has arrived.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Scheduled
            && self.scheduled_execution_at.is_some_and(|at| at <= now)
    }
}
