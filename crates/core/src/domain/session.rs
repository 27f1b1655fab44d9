use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::booking::OwnerId;
use crate::domain::request::TeeTimeRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    AwaitingConfirmation,
    AwaitingCancellationSelection,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::AwaitingCancellationSelection => "awaiting_cancellation_selection",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "awaiting_confirmation" => Some(Self::AwaitingConfirmation),
            "awaiting_cancellation_selection" => Some(Self::AwaitingCancellationSelection),
            _ => None,
        }
    }
}

/// Per-owner conversation state. Created lazily on first contact and
/// overwritten on every interaction; never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub owner: OwnerId,
    pub state: ConversationState,
    pub pending_request: Option<TeeTimeRequest>,
    pub last_interaction: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(owner: OwnerId, now: DateTime<Utc>) -> Self {
        Self { owner, state: ConversationState::Idle, pending_request: None, last_interaction: now }
    }

    pub fn reset(&mut self) {
        self.state = ConversationState::Idle;
        self.pending_request = None;
    }
}
