// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use fundchain_core::UnixSeconds;

use crate::ValidationError;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

fn non_negative(seconds: i64) -> Result<UnixSeconds, ValidationError> {
    u64::try_from(seconds)
        .map_err(|_| ValidationError("timestamp must not precede 1970-01-01".to_string()))
}

/// Deadline form input to unix seconds. Offset-less inputs are read as UTC.
pub fn parse_deadline_input(input: &str) -> Result<UnixSeconds, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("deadline must not be empty".to_string()));
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(s) {
        return non_negative(with_offset.timestamp());
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return non_negative(naive.and_utc().timestamp());
        }
    }
    parse_date_input(s)
        .map_err(|_| ValidationError(format!("`{s}` is not a recognised date or date-time")))
}

/// Calendar date (`YYYY-MM-DD`) to unix seconds at midnight UTC.
pub fn parse_date_input(input: &str) -> Result<UnixSeconds, ValidationError> {
    let s = input.trim();
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ValidationError(format!("`{s}` is not a YYYY-MM-DD date: {e}")))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ValidationError(format!("`{s}` has no midnight")))?;
    non_negative(midnight.and_utc().timestamp())
}

#[must_use]
pub fn format_unix(seconds: UnixSeconds) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("@{seconds}"))
}

/// Inverse of [`parse_deadline_input`] for the `YYYY-MM-DDTHH:MM` form shape.
#[must_use]
pub fn format_deadline_input(seconds: UnixSeconds) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}
