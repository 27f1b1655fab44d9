use serde::{Deserialize, Serialize};

use teetime_core::chrono::{NaiveDate, NaiveTime};
use teetime_core::errors::DomainError;
use teetime_core::TeeTimeRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Book,
    Confirm,
    Status,
    Cancel,
    Help,
    Unclear,
}

/// Request fields as far as the parser could extract them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDraft {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub party_size: Option<i64>,
    pub fallback_window_minutes: Option<i64>,
}

impl RequestDraft {
    /// `None` while date, time or party size is missing. Once all three are
    /// present the fields are validated.
    pub fn complete(
        &self,
        default_fallback_window_minutes: u32,
    ) -> Option<Result<TeeTimeRequest, DomainError>> {
        let (date, time, party_size) = (self.date?, self.time?, self.party_size?);
        let window = self
            .fallback_window_minutes
            .unwrap_or_else(|| i64::from(default_fallback_window_minutes));
        Some(TeeTimeRequest::from_raw(date, time, party_size, window))
    }
}

/// One inbound message after natural-language parsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent: IntentKind,
    #[serde(default)]
    pub request: Option<RequestDraft>,
    #[serde(default)]
    pub raw_message: Option<String>,
    /// Follow-up question the parser wants asked when fields are missing.
    #[serde(default)]
    pub clarification: Option<String>,
    /// Parser-supplied reply for unclear messages.
    #[serde(default)]
    pub response_message: Option<String>,
}

impl ParsedIntent {
    pub fn new(intent: IntentKind) -> Self {
        Self {
            intent,
            request: None,
            raw_message: None,
            clarification: None,
            response_message: None,
        }
    }

    pub fn book(draft: RequestDraft) -> Self {
        Self { request: Some(draft), ..Self::new(IntentKind::Book) }
    }

    pub fn with_raw_message(mut self, raw_message: impl Into<String>) -> Self {
        self.raw_message = Some(raw_message.into());
        self
    }
}
