use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Opaque, backend-specific token meaning "reserve this slot".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotHandle(pub String);

/// One genuinely reservable slot reported by a discovery call. Not persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub time: NaiveTime,
    pub handle: SlotHandle,
}

impl SlotCandidate {
    pub fn new(time: NaiveTime, handle: impl Into<String>) -> Self {
        Self { time, handle: SlotHandle(handle.into()) }
    }
}

/// Definite result of one reservation attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReservationOutcome {
    Booked { booked_time: NaiveTime, confirmation_token: Option<String> },
    Rejected { error_message: String, alternatives_hint: Option<String> },
}

impl ReservationOutcome {
    pub fn rejected(error_message: impl Into<String>) -> Self {
        Self::Rejected { error_message: error_message.into(), alternatives_hint: None }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Booked { .. })
    }
}

/// One party in a same-date batch handed to `book_multiple`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSlotRequest {
    pub key: String,
    pub time: NaiveTime,
    pub party_size: u8,
    pub fallback_window_minutes: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub key: String,
    pub outcome: ReservationOutcome,
}
