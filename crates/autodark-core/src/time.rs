//! Observation time parsing.
//!
//! Header dates are interpreted on a neutral UTC calendar so that time
//! differences between files never depend on the local time zone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Convert `DATE-OBS` (and optionally `TIME-OBS`) header values into a UTC instant.
///
/// `TIME-OBS` is only consulted when `DATE-OBS` has no time part. Fractional
/// seconds are dropped. Returns `None` when the date cannot be understood.
pub fn parse_observation_time(date_obs: &str, time_obs: Option<&str>) -> Option<DateTime<Utc>> {
    let date_obs = date_obs.trim().trim_end_matches('Z');
    if date_obs.is_empty() {
        return None;
    }

    let naive = if date_obs.contains('T') {
        NaiveDateTime::parse_from_str(date_obs, DATETIME_FORMAT).ok()?
    } else {
        let date = parse_date(date_obs)?;
        let time = time_obs
            .and_then(|t| NaiveTime::parse_from_str(t.trim(), TIME_FORMAT).ok())
            .unwrap_or(NaiveTime::MIN);
        date.and_time(time)
    };

    DateTime::from_timestamp(naive.and_utc().timestamp(), 0)
}

/// Absolute distance between two instants in whole seconds.
pub fn seconds_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_seconds().abs()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(date);
    }
    // Pre-1999 FITS convention: DD/MM/YY, always in the 1900s.
    let mut parts = s.split('/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || !(0..100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(1900 + year, month, day)
}
