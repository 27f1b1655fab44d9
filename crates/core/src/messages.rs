//! Owner-facing text. Every message the engine or the conversation tracker
//! sends is rendered here so wording stays consistent across channels.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::request::TeeTimeRequest;

pub const NOTHING_TO_CONFIRM: &str =
    "There's nothing to confirm. Would you like to book a tee time?";
pub const NEED_MORE_DETAILS: &str = "I need more details. What date and time would you like?";
pub const UNCLEAR_FALLBACK: &str =
    "I'm not sure I understood. Try 'Book Saturday 8am for 4 players'.";
pub const NO_UPCOMING_BOOKINGS: &str =
    "You don't have any upcoming bookings. Would you like to book a tee time?";
pub const NOTHING_TO_CANCEL: &str = "You don't have any bookings to cancel.";
pub const SELECTION_UNMATCHED: &str =
    "I couldn't match that to a booking. Please reply with the number (1, 2, 3, etc.) from the list.";
pub const SELECTION_AMBIGUOUS_TIME: &str =
    "You have multiple bookings at that time. Please reply with the number (1, 2, 3, etc.) from the list.";
pub const BACKEND_NOT_CONFIGURED: &str = "System not configured for booking";
pub const EXECUTION_TIMED_OUT: &str =
    "The booking attempt timed out. Please check the club website or try again.";

pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %d").to_string()
}

pub fn clock_time(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

/// "Saturday at 06:30 AM CST" in the club timezone.
pub fn window_opens(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant.with_timezone(&timezone).format("%A at %I:%M %p %Z").to_string()
}

pub fn players(count: u8) -> String {
    format!("{count} players")
}

pub fn booking_echo(request: &TeeTimeRequest) -> String {
    format!(
        "I'll book a tee time for {} at {} for {}. Reply 'yes' to confirm.",
        long_date(request.date()),
        clock_time(request.time()),
        players(request.party_size())
    )
}

/// Reply to a confirmed request, reflecting wherever the booking ended up.
pub fn creation_reply(booking: &Booking, timezone: Tz) -> String {
    let request = &booking.request;
    let date = long_date(request.date());
    let time = clock_time(request.time());
    let party = players(request.party_size());

    match booking.status {
        BookingStatus::Success => {
            let booked = clock_time(booking.actual_booked_time.unwrap_or(request.time()));
            format!("Booking confirmed! Reserved {date} at {booked} for {party}.")
        }
        BookingStatus::Failed => format!(
            "Booking attempted for {date} at {time} for {party}, but it failed. I'll text you \
             with more details."
        ),
        BookingStatus::InProgress => format!(
            "Booking in progress for {date} at {time} for {party}. I'll text you with the result."
        ),
        _ => match booking.scheduled_execution_at {
            Some(instant) => format!(
                "Booking scheduled! I'll attempt to reserve {date} at {time} for {party}. The \
                 booking window opens {}. I'll text you with the result.",
                window_opens(instant, timezone)
            ),
            None => format!(
                "Booking request received for {date} at {time} for {party}. I'll text you with \
                 updates."
            ),
        },
    }
}

/// One line per booking: "- Saturday, December 20 at 08:00 AM: scheduled".
pub fn status_listing(bookings: &[Booking]) -> String {
    if bookings.is_empty() {
        return NO_UPCOMING_BOOKINGS.to_string();
    }

    let lines: Vec<String> = bookings
        .iter()
        .map(|booking| {
            format!(
                "- {} at {}: {}",
                long_date(booking.request.date()),
                clock_time(booking.request.time()),
                booking.status
            )
        })
        .collect();
    format!("Your upcoming bookings:\n{}", lines.join("\n"))
}

pub fn cancellation_prompt(bookings: &[Booking]) -> String {
    let lines: Vec<String> = bookings
        .iter()
        .enumerate()
        .map(|(index, booking)| {
            format!(
                "{}. {} at {} for {} ({})",
                index + 1,
                long_date(booking.request.date()),
                clock_time(booking.request.time()),
                players(booking.request.party_size()),
                booking.status
            )
        })
        .collect();
    format!("Which booking would you like to cancel? Reply with the number.\n{}", lines.join("\n"))
}

pub fn cancelled(booking: &Booking) -> String {
    format!(
        "Your booking for {} at {} has been cancelled.",
        long_date(booking.request.date()),
        clock_time(booking.request.time())
    )
}

pub fn selection_ambiguous_date(date: NaiveDate) -> String {
    format!(
        "You have multiple bookings on {}. Please reply with the number (1, 2, 3, etc.) from the \
         list.",
        date.format("%B %d")
    )
}

pub fn help_text(club_name: &str, days_in_advance: u32, opens_at: NaiveTime) -> String {
    format!(
        "I can help you book tee times at {club_name}!\n\nTry saying:\n- 'Book Saturday 8am for \
         4 players'\n- 'Check my bookings'\n- 'Cancel my booking'\n\nReservations open \
         {days_in_advance} days in advance at {}.",
        opens_at.format("%-I:%M%P")
    )
}

/// "Saturday, December 20 at 08:08 AM for 4 players", the detail line shared
/// by confirmation and failure notices.
pub fn booking_details(request: &TeeTimeRequest, time: NaiveTime) -> String {
    format!(
        "{} at {} for {}",
        long_date(request.date()),
        clock_time(time),
        players(request.party_size())
    )
}

pub fn confirmation_notice(details: &str, confirmation_token: Option<&str>) -> String {
    match confirmation_token {
        Some(token) => format!("Tee time booking confirmed! {details} (Confirmation: {token})"),
        None => format!("Tee time booking confirmed! {details}"),
    }
}

pub fn failure_notice(reason: &str, alternatives: Option<&str>, details: Option<&str>) -> String {
    let mut message = match details {
        Some(details) => format!("Unable to book tee time for {details}: {reason}"),
        None => format!("Unable to book tee time: {reason}"),
    };
    if let Some(alternatives) = alternatives.filter(|value| !value.is_empty()) {
        message.push_str("\n\nAlternatives available: ");
        message.push_str(alternatives);
    }
    message
}
