use serde::Deserialize;
use serde_json::Value;

use crate::limits::MAX_DAY_OFFSET_MINUTES;
use crate::model::{BusinessHours, DayHours, Minutes};

// ── Business-hours normalization ──────────────────────────────────

/// The raw per-day shapes accepted from directory records, tried in
/// order. Anything else leaves the day closed.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDayHours {
    /// "09:00-17:00"
    Range(String),
    /// [540, 1020]
    MinutePair(f64, f64),
    /// { "startMinutes": 540, "endMinutes": 1020 }
    Explicit {
        #[serde(rename = "startMinutes")]
        start_minutes: f64,
        #[serde(rename = "endMinutes")]
        end_minutes: f64,
    },
    /// { "start": 540, "end": 1020 }
    Offsets { start: f64, end: f64 },
    /// { "startTime": "09:00", "endTime": "17:00" }
    Clock {
        #[serde(rename = "startTime")]
        start_time: String,
        #[serde(rename = "endTime")]
        end_time: String,
    },
}

/// Convert a raw weekly-hours payload into the canonical per-weekday map.
///
/// Accepts an object keyed by weekday index ("0"=Sunday … "6"=Saturday)
/// or an array indexed positionally. Malformed entries close that day;
/// windows with `end <= start`, negative offsets, or offsets past
/// [`MAX_DAY_OFFSET_MINUTES`] are dropped. Never fails: `None` just
/// means no weekday survived, and callers fall back to
/// [`BusinessHours::weekday_default`].
pub fn normalize(raw: &Value) -> Option<BusinessHours> {
    let mut hours = BusinessHours::default();
    match raw {
        Value::Object(map) => {
            for (key, entry) in map {
                if let Ok(weekday) = key.trim().parse::<usize>()
                    && weekday < 7
                    && let Some(day) = normalize_day(entry) {
                        hours.set(weekday, day);
                    }
            }
        }
        Value::Array(entries) => {
            for (weekday, entry) in entries.iter().enumerate().take(7) {
                if let Some(day) = normalize_day(entry) {
                    hours.set(weekday, day);
                }
            }
        }
        _ => return None,
    }
    if hours.is_empty() { None } else { Some(hours) }
}

fn normalize_day(entry: &Value) -> Option<DayHours> {
    if entry.is_null() {
        return None;
    }
    let raw: RawDayHours = serde_json::from_value(entry.clone()).ok()?;
    let (start, end) = match raw {
        RawDayHours::Range(range) => {
            let mut halves = range.split('-');
            match (halves.next(), halves.next(), halves.next()) {
                (Some(open), Some(close), None) => {
                    (parse_clock_minutes(open)?, parse_clock_minutes(close)?)
                }
                _ => return None,
            }
        }
        RawDayHours::MinutePair(start, end) => (start.floor() as Minutes, end.floor() as Minutes),
        RawDayHours::Explicit { start_minutes, end_minutes } => {
            (start_minutes.floor() as Minutes, end_minutes.floor() as Minutes)
        }
        RawDayHours::Offsets { start, end } => (start.floor() as Minutes, end.floor() as Minutes),
        RawDayHours::Clock { start_time, end_time } => {
            (parse_clock_minutes(&start_time)?, parse_clock_minutes(&end_time)?)
        }
    };
    (start >= 0 && end > start && end <= MAX_DAY_OFFSET_MINUTES)
        .then_some(DayHours { start_minutes: start, end_minutes: end })
}

/// Parse "H" or "HH:MM" into minutes since midnight. Pieces are trimmed;
/// a missing minutes piece counts as 0; anything unparseable, or a total
/// that overflows, is `None`. Pieces past the minutes (seconds etc.) are
/// ignored.
pub fn parse_clock_minutes(clock: &str) -> Option<Minutes> {
    let mut pieces = clock.split(':');
    let hour: Minutes = pieces.next()?.trim().parse().ok()?;
    let minute: Minutes = match pieces.next() {
        Some(piece) => piece.trim().parse().ok()?,
        None => 0,
    };
    hour.checked_mul(60)?.checked_add(minute)
}
