use crate::types::{SarError, SarResult};
use chrono::{DateTime, Utc};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

const MICROS_PER_DAY: f64 = SECONDS_PER_DAY * 1.0e6;

/// Unix timestamp of 2000-01-01T00:00:00Z
const MJD2000_EPOCH_UNIX_SECONDS: i64 = 946_684_800;

/// Keeps the microsecond count well inside i64
const MAX_ABS_MJD: f64 = 1.0e7;

/// Convert a UTC timestamp to MJD2000 days (microsecond resolution)
pub fn utc_to_mjd(time: DateTime<Utc>) -> f64 {
    let micros = time.timestamp_micros() - MJD2000_EPOCH_UNIX_SECONDS * 1_000_000;
    micros as f64 / MICROS_PER_DAY
}

/// Convert MJD2000 days back to a UTC timestamp, rounded to the microsecond
pub fn mjd_to_utc(mjd: f64) -> SarResult<DateTime<Utc>> {
    if !mjd.is_finite() {
        return Err(SarError::InvalidParameter(format!("non-finite MJD value {}", mjd)));
    }
    if mjd.abs() > MAX_ABS_MJD {
        return Err(SarError::InvalidParameter(format!("MJD value {} out of range", mjd)));
    }

    let micros = (mjd * MICROS_PER_DAY).round() as i64 + MJD2000_EPOCH_UNIX_SECONDS * 1_000_000;
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;

    DateTime::<Utc>::from_timestamp(secs, nanos)
        .ok_or_else(|| SarError::InvalidParameter(format!("MJD value {} out of range", mjd)))
}

/// Express a duration in seconds as days
#[inline]
pub fn seconds_to_days(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY
}
