//! Nearest-available-time matching within a fallback window.

use chrono::{NaiveTime, Timelike};

use crate::domain::slot::SlotCandidate;

/// Number of discovered times surfaced to the owner when nothing matched.
pub const MAX_ALTERNATIVES: usize = 5;

pub fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Picks the candidate closest to `requested` whose distance is within
/// `fallback_window_minutes`.
///
/// Candidates are expected in ascending time order. Only a strictly smaller
/// distance replaces the current pick, so a tie goes to the earlier slot.
pub fn select_best_match<'a>(
    candidates: &'a [SlotCandidate],
    requested: NaiveTime,
    fallback_window_minutes: u32,
) -> Option<&'a SlotCandidate> {
    let target = minutes_since_midnight(requested);
    let mut best: Option<(&SlotCandidate, u32)> = None;

    for candidate in candidates {
        let diff = minutes_since_midnight(candidate.time).abs_diff(target);
        if diff > fallback_window_minutes {
            continue;
        }
        if best.map_or(true, |(_, best_diff)| diff < best_diff) {
            best = Some((candidate, diff));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Human-readable list of up to [`MAX_ALTERNATIVES`] discovered times, or
/// `None` when discovery found nothing at all.
pub fn alternatives_hint(candidates: &[SlotCandidate]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let times: Vec<String> = candidates
        .iter()
        .take(MAX_ALTERNATIVES)
        .map(|candidate| candidate.time.format("%I:%M %p").to_string())
        .collect();
    Some(times.join(", "))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{alternatives_hint, minutes_since_midnight, select_best_match};
    use crate::domain::slot::SlotCandidate;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn candidates(times: &[(u32, u32)]) -> Vec<SlotCandidate> {
        times
            .iter()
            .map(|&(hour, minute)| SlotCandidate::new(at(hour, minute), format!("{hour:02}{minute:02}")))
            .collect()
    }

    #[test]
    fn minutes_since_midnight_ignores_seconds() {
        assert_eq!(minutes_since_midnight(at(8, 8)), 488);
        assert_eq!(minutes_since_midnight(NaiveTime::from_hms_opt(0, 0, 59).expect("time")), 0);
    }

    #[test]
    fn picks_smallest_difference_within_window() {
        let slots = candidates(&[(7, 30), (7, 46), (8, 8)]);
        let picked = select_best_match(&slots, at(8, 0), 30).expect("match");
        assert_eq!(picked.time, at(8, 8));
    }

    #[test]
    fn exact_time_wins() {
        let slots = candidates(&[(7, 52), (8, 0), (8, 4)]);
        let picked = select_best_match(&slots, at(8, 0), 30).expect("match");
        assert_eq!(picked.time, at(8, 0));
    }

    #[test]
    fn equal_distance_goes_to_the_earlier_slot() {
        let slots = candidates(&[(7, 50), (8, 10)]);
        let picked = select_best_match(&slots, at(8, 0), 10).expect("match");
        assert_eq!(picked.time, at(7, 50));
    }

    #[test]
    fn nothing_within_window_returns_none_and_surfaces_alternatives() {
        let slots = candidates(&[(7, 30), (8, 10)]);
        assert!(select_best_match(&slots, at(8, 0), 5).is_none());

        let hint = alternatives_hint(&slots).expect("hint");
        assert_eq!(hint, "07:30 AM, 08:10 AM");
    }

    #[test]
    fn zero_window_requires_exact_minute() {
        let slots = candidates(&[(8, 1)]);
        assert!(select_best_match(&slots, at(8, 0), 0).is_none());
    }

    #[test]
    fn alternatives_are_capped_at_five() {
        let slots = candidates(&[(7, 0), (7, 10), (7, 20), (7, 30), (7, 40), (7, 50), (8, 0)]);
        let hint = alternatives_hint(&slots).expect("hint");
        assert_eq!(hint.split(", ").count(), 5);
        assert!(!hint.contains("07:50"));
        assert!(alternatives_hint(&[]).is_none());
    }
}
