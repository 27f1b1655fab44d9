//! Per-owner conversation state machine.
//!
//! The tracker turns a sequence of parsed intents into a confirmed request and
//! hands it to the booking engine. It never talks to the reservation backend
//! or the messaging transport itself; the returned string is the reply.

use std::sync::Arc;

use tracing::info;

use teetime_core::chrono::NaiveTime;
use teetime_core::errors::{ApplicationError, DomainError};
use teetime_core::messages;
use teetime_core::{
    Booking, BookingEngine, ConversationSession, ConversationState, OwnerId, SessionStore,
};

use crate::intent::{IntentKind, ParsedIntent};

pub struct ConversationTracker {
    engine: BookingEngine,
    sessions: Arc<dyn SessionStore>,
    club_name: String,
    default_fallback_window_minutes: u32,
}

impl ConversationTracker {
    pub fn new(
        engine: BookingEngine,
        sessions: Arc<dyn SessionStore>,
        club_name: impl Into<String>,
        default_fallback_window_minutes: u32,
    ) -> Self {
        Self { engine, sessions, club_name: club_name.into(), default_fallback_window_minutes }
    }

    pub async fn session(&self, owner: &OwnerId) -> Result<ConversationSession, ApplicationError> {
        let now = self.engine.now();
        Ok(self
            .sessions
            .get(owner)
            .await?
            .unwrap_or_else(|| ConversationSession::new(owner.clone(), now)))
    }

    /// Applies one parsed message to the owner's session and returns the reply.
    pub async fn advance(
        &self,
        owner: &OwnerId,
        intent: &ParsedIntent,
    ) -> Result<String, ApplicationError> {
        let mut session = self.session(owner).await?;
        session.last_interaction = self.engine.now();

        let abandons_selection = matches!(intent.intent, IntentKind::Book | IntentKind::Help);
        if session.state == ConversationState::AwaitingCancellationSelection && abandons_selection {
            session.reset();
        }

        let reply = if session.state == ConversationState::AwaitingCancellationSelection {
            self.handle_selection(&mut session, intent).await?
        } else {
            match intent.intent {
                IntentKind::Book => self.handle_book(&mut session, intent),
                IntentKind::Confirm => self.handle_confirm(&mut session).await?,
                IntentKind::Status => self.handle_status(owner).await?,
                IntentKind::Cancel => self.handle_cancel(&mut session).await?,
                IntentKind::Help => self.help_text(),
                IntentKind::Unclear => intent
                    .response_message
                    .clone()
                    .unwrap_or_else(|| messages::UNCLEAR_FALLBACK.to_string()),
            }
        };

        self.sessions.save(&session).await?;
        info!(
            event_name = "conversation.advanced",
            owner = %owner,
            intent = ?intent.intent,
            state = session.state.as_str(),
            "conversation advanced"
        );
        Ok(reply)
    }

    fn handle_book(&self, session: &mut ConversationSession, intent: &ParsedIntent) -> String {
        let completed = intent
            .request
            .as_ref()
            .and_then(|draft| draft.complete(self.default_fallback_window_minutes));

        match completed {
            Some(Ok(request)) => {
                let reply = messages::booking_echo(&request);
                session.pending_request = Some(request);
                session.state = ConversationState::AwaitingConfirmation;
                reply
            }
            Some(Err(error)) => rejection_text(&error),
            None => intent
                .clarification
                .clone()
                .unwrap_or_else(|| messages::NEED_MORE_DETAILS.to_string()),
        }
    }

    async fn handle_confirm(
        &self,
        session: &mut ConversationSession,
    ) -> Result<String, ApplicationError> {
        let pending = match (session.state, session.pending_request.take()) {
            (ConversationState::AwaitingConfirmation, Some(request)) => request,
            _ => return Ok(messages::NOTHING_TO_CONFIRM.to_string()),
        };
        session.reset();

        match self.engine.create_booking(session.owner.clone(), pending).await {
            Ok(booking) => Ok(messages::creation_reply(&booking, self.engine.timezone())),
            Err(ApplicationError::Domain(error)) => Ok(rejection_text(&error)),
            Err(error) => Err(error),
        }
    }

    async fn handle_status(&self, owner: &OwnerId) -> Result<String, ApplicationError> {
        let bookings = self.engine.active_bookings(owner).await?;
        Ok(messages::status_listing(&bookings))
    }

    async fn handle_cancel(
        &self,
        session: &mut ConversationSession,
    ) -> Result<String, ApplicationError> {
        let mut cancellable = self.engine.cancellable_bookings(&session.owner).await?;
        match cancellable.len() {
            0 => Ok(messages::NOTHING_TO_CANCEL.to_string()),
            1 => {
                let booking = cancellable.remove(0);
                self.cancel(&booking).await
            }
            _ => {
                session.state = ConversationState::AwaitingCancellationSelection;
                Ok(messages::cancellation_prompt(&cancellable))
            }
        }
    }

    async fn handle_selection(
        &self,
        session: &mut ConversationSession,
        intent: &ParsedIntent,
    ) -> Result<String, ApplicationError> {
        let cancellable = self.engine.cancellable_bookings(&session.owner).await?;
        if cancellable.is_empty() {
            session.reset();
            return Ok(messages::NOTHING_TO_CANCEL.to_string());
        }

        match select_booking(&cancellable, intent) {
            Selection::Picked(index) => {
                session.reset();
                self.cancel(&cancellable[index]).await
            }
            Selection::AmbiguousTime => Ok(messages::SELECTION_AMBIGUOUS_TIME.to_string()),
            Selection::AmbiguousDate(date) => Ok(messages::selection_ambiguous_date(date)),
            Selection::Unmatched => Ok(messages::SELECTION_UNMATCHED.to_string()),
        }
    }

    async fn cancel(&self, booking: &Booking) -> Result<String, ApplicationError> {
        match self.engine.cancel_booking(&booking.id).await {
            Ok(cancelled) => Ok(messages::cancelled(&cancelled)),
            Err(ApplicationError::StateConflict { status, .. }) => Ok(format!(
                "That booking is already {status} and can no longer be cancelled."
            )),
            Err(error) => Err(error),
        }
    }

    fn help_text(&self) -> String {
        let window = &self.engine.policy().window;
        let opens_at =
            NaiveTime::from_hms_opt(window.open_hour, window.open_minute, 0).unwrap_or(NaiveTime::MIN);
        messages::help_text(&self.club_name, window.days_in_advance, opens_at)
    }
}

fn rejection_text(error: &DomainError) -> String {
    match error {
        DomainError::InvalidRequest(message) => message.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Selection {
    Picked(usize),
    AmbiguousTime,
    AmbiguousDate(teetime_core::chrono::NaiveDate),
    Unmatched,
}

/// Matches a reply against the numbered cancellation list: a 1-based number
/// first, then the date the parser extracted. A lone booking on that date is
/// picked whatever the time.
fn select_booking(bookings: &[Booking], intent: &ParsedIntent) -> Selection {
    let raw = intent.raw_message.as_deref().unwrap_or_default().trim();
    if let Ok(number) = raw.trim_end_matches('.').parse::<usize>() {
        return if (1..=bookings.len()).contains(&number) {
            Selection::Picked(number - 1)
        } else {
            Selection::Unmatched
        };
    }

    let Some(date) = intent.request.as_ref().and_then(|draft| draft.date) else {
        return Selection::Unmatched;
    };
    let time = intent.request.as_ref().and_then(|draft| draft.time);

    let on_date: Vec<usize> = bookings
        .iter()
        .enumerate()
        .filter(|(_, booking)| booking.request.date() == date)
        .map(|(index, _)| index)
        .collect();
    match on_date.as_slice() {
        [] => return Selection::Unmatched,
        [index] => return Selection::Picked(*index),
        _ => {}
    }

    // Time only narrows a date with several bookings.
    let at_time: Vec<usize> = on_date
        .iter()
        .copied()
        .filter(|&index| time.is_some_and(|time| bookings[index].request.time() == time))
        .collect();
    match at_time.as_slice() {
        [index] => Selection::Picked(*index),
        [] => Selection::AmbiguousDate(date),
        _ => Selection::AmbiguousTime,
    }
}
