use crate::error::{ProcessingError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// UTC timestamp used as the row key of every table
pub type Timestamp = DateTime<Utc>;

/// Build a UTC timestamp from the `Year`, `DOY(U)` and `UTC` (HH:MM) fields of a data block
pub fn timestamp_from_ordinal(year: &str, day_of_year: &str, hhmm: &str) -> Result<Timestamp> {
    let date = date_from_ordinal(year, day_of_year)?;
    let time = NaiveTime::parse_from_str(hhmm.trim(), "%H:%M").map_err(|_| {
        ProcessingError::InvalidFormat(format!("Invalid UTC time: '{}'", hhmm))
    })?;

    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Parse a `YYYY` / `DDD` pair into a calendar date
pub fn date_from_ordinal(year: &str, day_of_year: &str) -> Result<NaiveDate> {
    let year_value = year.trim().parse::<i32>().map_err(|_| {
        ProcessingError::InvalidFormat(format!("Invalid year: '{}'", year))
    })?;
    let ordinal = day_of_year.trim().parse::<u32>().map_err(|_| {
        ProcessingError::InvalidFormat(format!("Invalid day of year: '{}'", day_of_year))
    })?;

    NaiveDate::from_yo_opt(year_value, ordinal).ok_or_else(|| {
        ProcessingError::InvalidFormat(format!(
            "Day of year {} out of range for year {}",
            ordinal, year_value
        ))
    })
}

/// Parse a user supplied time bound.
///
/// Accepts RFC 3339 (`2018-05-28T01:00:00Z`), a naive UTC date-time with or without
/// seconds (`2018-05-28T01:00`, `2018-05-28 01:00:00`) or a bare date (midnight UTC).
pub fn parse_time_bound(value: &str) -> Result<Timestamp> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

pub fn format_timestamp(timestamp: &Timestamp) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
