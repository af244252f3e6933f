use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _,
    Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::InsightsError;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting to a [`Tz`].
///
/// `"auto"` resolves to the system zone. Unrecognised names fall back to UTC
/// and log a warning.
pub fn resolve_timezone(tz_name: &str) -> Tz {
    let name = if tz_name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        tz_name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

// ── TimeUnit ──────────────────────────────────────────────────────────────────

/// Calendar period a timestamp is truncated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Hour,
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 5] = [
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Month,
        TimeUnit::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = InsightsError;

    /// Accepts singular and plural names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" | "hours" => Ok(TimeUnit::Hour),
            "day" | "days" => Ok(TimeUnit::Day),
            "week" | "weeks" => Ok(TimeUnit::Week),
            "month" | "months" => Ok(TimeUnit::Month),
            "year" | "years" => Ok(TimeUnit::Year),
            _ => Err(InsightsError::InvalidTimeUnit(s.to_string())),
        }
    }
}

// ── Truncation ────────────────────────────────────────────────────────────────

/// Truncate epoch milliseconds to the start of the containing `unit` period,
/// evaluated in the calendar of `tz`.
///
/// * `hour`  – zero minutes, seconds and milliseconds.
/// * `day`   – zero the time of day.
/// * `week`  – zero the time of day and rewind to the preceding Sunday.
/// * `month` – midnight on the 1st of the month.
/// * `year`  – midnight on January 1st.
///
/// Returns the bucket start as epoch milliseconds. Inputs whose bucket start
/// falls outside the representable calendar are returned unchanged.
pub fn truncate_millis(millis: i64, unit: TimeUnit, tz: &Tz) -> i64 {
    bucket_start(millis, unit, tz).unwrap_or(millis)
}

fn bucket_start(millis: i64, unit: TimeUnit, tz: &Tz) -> Option<i64> {
    let local = DateTime::<Utc>::from_timestamp_millis(millis)?
        .with_timezone(tz)
        .naive_local();
    let date = local.date();

    let truncated = match unit {
        TimeUnit::Hour => date.and_hms_opt(local.hour(), 0, 0)?,
        TimeUnit::Day => start_of_day(date),
        TimeUnit::Week => {
            let back = i64::from(local.weekday().num_days_from_sunday());
            start_of_day(date.checked_sub_signed(Duration::days(back))?)
        }
        TimeUnit::Month => start_of_day(date.with_day(1)?),
        TimeUnit::Year => start_of_day(NaiveDate::from_ymd_opt(local.year(), 1, 1)?),
    };

    local_to_utc(tz, truncated).map(|dt| dt.timestamp_millis())
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Map a local wall-clock time back to an instant.
///
/// Ambiguous times (DST fall-back) take the earliest instant. Times inside a
/// DST gap move forward to the first valid instant after the gap.
fn local_to_utc(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    let mut candidate = naive;
    // Real-world gaps never exceed a few hours.
    for _ in 0..8 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                return Some(dt.with_timezone(&Utc));
            }
            LocalResult::None => {
                candidate = candidate.checked_add_signed(Duration::minutes(30))?;
            }
        }
    }
    warn!("could not resolve local time {} in {}", naive, tz);
    Some(Utc.from_utc_datetime(&naive))
}

// ── Formatting ────────────────────────────────────────────────────────────────

/// Render a bucket start as a local date (or date-hour for hourly buckets).
pub fn format_bucket(millis: i64, unit: TimeUnit, tz: &Tz) -> String {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(millis) else {
        return millis.to_string();
    };
    let local = utc.with_timezone(tz);
    match unit {
        TimeUnit::Hour => local.format("%Y-%m-%d %H:00").to_string(),
        TimeUnit::Day | TimeUnit::Week => local.format("%Y-%m-%d").to_string(),
        TimeUnit::Month => local.format("%Y-%m").to_string(),
        TimeUnit::Year => local.format("%Y").to_string(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
