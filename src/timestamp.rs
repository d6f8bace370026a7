//! Timestamp resolution shared by the judge, the planner and the executor.
//!
//! Timestamps are seconds since the Unix epoch as `f64`, the shape the
//! inventory step records. Either `created_at` or `modified_at` may be a
//! platform "unset" sentinel, so neither is trusted alone.

use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone, Timelike};
use rand::Rng;

/// 1980-01-02T00:00:00Z. Anything older is treated as an epoch sentinel.
pub const MIN_VALID_TIMESTAMP: f64 = 315_619_200.0;

/// Jitter window around noon applied to artificial midnight dates.
pub const JITTER_SECONDS: i64 = 4 * 60 * 60;

pub fn is_valid(ts: f64) -> bool {
    ts.is_finite() && ts >= MIN_VALID_TIMESTAMP
}

/// Best estimate of a file's true origin date.
///
/// Both valid: the older one. One valid: that one. Neither valid: the larger
/// of the two, since a value closer to now is less wrong than an epoch value.
pub fn resolve_effective_timestamp(created: f64, modified: f64) -> f64 {
    match (is_valid(created), is_valid(modified)) {
        (true, true) => created.min(modified),
        (true, false) => created,
        (false, true) => modified,
        (false, false) => created.max(modified),
    }
}

pub fn to_local(ts: f64) -> DateTime<Local> {
    let secs = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1e9) as u32;
    DateTime::from_timestamp(secs, nanos.min(999_999_999))
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// Folder and prefix segments derived from one resolved date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl DateParts {
    pub fn from_timestamp(ts: f64) -> Self {
        let dt = to_local(ts);
        Self {
            year: dt.format("%Y").to_string(),
            month: dt.format("%Y-%m").to_string(),
            day: dt.format("%Y-%m-%d").to_string(),
        }
    }
}

pub fn is_midnight(ts: f64) -> bool {
    let dt = to_local(ts);
    dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0
}

/// Replace an exact local midnight with a random moment within
/// [`JITTER_SECONDS`] of noon on the same day. Other values pass through.
pub fn apply_jitter_if_midnight<R: Rng + ?Sized>(ts: f64, rng: &mut R) -> f64 {
    if !is_midnight(ts) {
        return ts;
    }
    let dt = to_local(ts);
    let noon = dt
        .date_naive()
        .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
    let noon = match Local.from_local_datetime(&noon).earliest() {
        Some(n) => n,
        None => return ts,
    };
    let offset = rng.gen_range(-JITTER_SECONDS..=JITTER_SECONDS);
    let jittered = noon + Duration::seconds(offset);
    debug_assert_eq!(jittered.day(), dt.day());
    jittered.timestamp() as f64
}
