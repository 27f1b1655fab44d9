use serde::Serialize;
use teetime_core::chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use teetime_core::{BookingId, OwnerId};

use crate::commands::{engine, load_config, open_pool, parse_instant, runtime, CommandResult};

#[derive(Debug, Serialize)]
struct DueBooking {
    booking_id: BookingId,
    owner: OwnerId,
    date: NaiveDate,
    time: NaiveTime,
    party_size: u8,
    scheduled_execution_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct DueReport {
    at: DateTime<Utc>,
    total_due: usize,
    bookings: Vec<DueBooking>,
}

/// Lists bookings a sweep at `at` (default: now) would execute, without
/// executing them.
pub fn run(at: Option<&str>) -> CommandResult {
    let at = match parse_instant("due", at) {
        Ok(at) => at,
        Err(result) => return result,
    };
    let config = match load_config("due") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("due") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let engine = engine(&config, &pool)?;
        let due = engine
            .due_bookings(at)
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8));
        pool.close().await;
        due
    });

    match result {
        Ok(due) => {
            let bookings: Vec<DueBooking> = due
                .into_iter()
                .map(|booking| DueBooking {
                    date: booking.request.date(),
                    time: booking.request.time(),
                    party_size: booking.request.party_size(),
                    booking_id: booking.id,
                    owner: booking.owner,
                    scheduled_execution_at: booking.scheduled_execution_at,
                })
                .collect();
            let report = DueReport { at, total_due: bookings.len(), bookings };
            CommandResult::report("due", "ok", &report, 0)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("due", error_class, message, exit_code)
        }
    }
}
