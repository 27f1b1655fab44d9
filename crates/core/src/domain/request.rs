use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const MIN_PARTY_SIZE: u8 = 1;
pub const MAX_PARTY_SIZE: u8 = 4;
pub const DEFAULT_FALLBACK_WINDOW_MINUTES: u32 = 30;

/// A desired reservation: date, time of day, party size and the tolerance
/// within which another time is acceptable.
///
/// Fields are private so every value in circulation has passed validation;
/// deserialization goes through the same checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TeeTimeRequestFields", into = "TeeTimeRequestFields")]
pub struct TeeTimeRequest {
    date: NaiveDate,
    time: NaiveTime,
    party_size: u8,
    fallback_window_minutes: u32,
}

impl TeeTimeRequest {
    pub fn new(
        date: NaiveDate,
        time: NaiveTime,
        party_size: u8,
        fallback_window_minutes: u32,
    ) -> Result<Self, DomainError> {
        if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&party_size) {
            return Err(DomainError::InvalidRequest(format!(
                "party size must be between {MIN_PARTY_SIZE} and {MAX_PARTY_SIZE}, got {party_size}"
            )));
        }

        Ok(Self { date, time, party_size, fallback_window_minutes })
    }

    /// Same as [`TeeTimeRequest::new`] but accepts the wider integer types an
    /// HTTP or JSON boundary hands over, rejecting negatives instead of wrapping.
    pub fn from_raw(
        date: NaiveDate,
        time: NaiveTime,
        party_size: i64,
        fallback_window_minutes: i64,
    ) -> Result<Self, DomainError> {
        let party_size = u8::try_from(party_size).map_err(|_| {
            DomainError::InvalidRequest(format!(
                "party size must be between {MIN_PARTY_SIZE} and {MAX_PARTY_SIZE}, got {party_size}"
            ))
        })?;
        let fallback_window_minutes = u32::try_from(fallback_window_minutes).map_err(|_| {
            DomainError::InvalidRequest(format!(
                "fallback window must be zero or more minutes, got {fallback_window_minutes}"
            ))
        })?;

        Self::new(date, time, party_size, fallback_window_minutes)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn party_size(&self) -> u8 {
        self.party_size
    }

    pub fn fallback_window_minutes(&self) -> u32 {
        self.fallback_window_minutes
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TeeTimeRequestFields {
    date: NaiveDate,
    time: NaiveTime,
    party_size: i64,
    #[serde(default = "default_fallback_window")]
    fallback_window_minutes: i64,
}

fn default_fallback_window() -> i64 {
    i64::from(DEFAULT_FALLBACK_WINDOW_MINUTES)
}

impl TryFrom<TeeTimeRequestFields> for TeeTimeRequest {
    type Error = DomainError;

    fn try_from(value: TeeTimeRequestFields) -> Result<Self, Self::Error> {
        Self::from_raw(value.date, value.time, value.party_size, value.fallback_window_minutes)
    }
}

impl From<TeeTimeRequest> for TeeTimeRequestFields {
    fn from(value: TeeTimeRequest) -> Self {
        Self {
            date: value.date,
            time: value.time,
            party_size: i64::from(value.party_size),
            fallback_window_minutes: i64::from(value.fallback_window_minutes),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::TeeTimeRequest;
    use crate::errors::DomainError;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 20).expect("valid date")
    }

    fn eight_am() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 0, 0).expect("valid time")
    }

    #[test]
    fn accepts_party_sizes_one_through_four() {
        for size in 1..=4 {
            let request = TeeTimeRequest::new(date(), eight_am(), size, 30).expect("valid size");
            assert_eq!(request.party_size(), size);
        }
    }

    #[test]
    fn rejects_party_size_outside_range() {
        for size in [0, 5, 12] {
            let error = TeeTimeRequest::new(date(), eight_am(), size, 30).expect_err("invalid");
            assert!(matches!(error, DomainError::InvalidRequest(_)));
        }
    }

    #[test]
    fn rejects_negative_fallback_window_from_raw_input() {
        let error =
            TeeTimeRequest::from_raw(date(), eight_am(), 4, -5).expect_err("negative window");
        assert!(error.to_string().contains("fallback window"));
    }

    #[test]
    fn deserialization_applies_validation_and_default_window() {
        let parsed: TeeTimeRequest =
            serde_json::from_str(r#"{"date":"2025-12-20","time":"08:00:00","party_size":2}"#)
                .expect("valid json");
        assert_eq!(parsed.fallback_window_minutes(), 30);

        let invalid = serde_json::from_str::<TeeTimeRequest>(
            r#"{"date":"2025-12-20","time":"08:00:00","party_size":9}"#,
        );
        assert!(invalid.is_err());
    }
}
