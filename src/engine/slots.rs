use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::model::{AvailabilityOptions, AvailabilitySlot, BusinessHours, BusyInterval, Minutes, TimePoint};

// ── Slot generation ───────────────────────────────────────────────

/// Walk each local calendar day of `[from, to]` and emit every candidate
/// slot with its availability flag.
///
/// Per day: look up the weekday's hours (none → closed, `skip_weekends`
/// forces Sat/Sun closed), anchor open/close at the first valid local
/// instant plus the minute offsets, drop the whole day once the busy
/// count reaches `max_daily_bookings`, then step from open in
/// `slot_minutes` increments while a full slot fits before close. Slots
/// starting before `now` are dropped; a slot is unavailable when its
/// start falls inside any buffer-padded busy interval. Boundaries are
/// emitted as UTC instants. Magnitudes the calendar cannot represent
/// never abort the walk: an unrepresentable step yields no slots, an
/// unrepresentable day offset skips that day.
pub fn generate(
    from: TimePoint,
    to: TimePoint,
    slot_minutes: Minutes,
    busy: &[BusyInterval],
    options: &AvailabilityOptions,
) -> Vec<AvailabilitySlot> {
    if slot_minutes <= 0 {
        return Vec::new();
    }
    let tz = options.time_zone.unwrap_or(Tz::UTC);
    let default_hours;
    let hours: &BusinessHours = match options.business_hours.as_ref() {
        Some(configured) => configured,
        None => {
            default_hours = BusinessHours::weekday_default();
            &default_hours
        }
    };
    let now = options.now.unwrap_or_else(Utc::now);
    let Some(slot_len) = Duration::try_minutes(slot_minutes) else {
        return Vec::new();
    };
    let buffer = options.buffer_minutes.max(0);

    let start_date = from.with_timezone(&tz).date_naive();
    let end_date = to.with_timezone(&tz).date_naive();

    let mut slots = Vec::new();
    let days = std::iter::successors(Some(start_date), |day| day.succ_opt())
        .take_while(|day| *day <= end_date);
    for date in days {
        let weekday = date.weekday().num_days_from_sunday() as usize;
        let Some(day_hours) = hours.get(weekday) else { continue };
        if options.skip_weekends && (weekday == 0 || weekday == 6) {
            continue;
        }
        let Some(anchor) = local_day_start(tz, date) else { continue };
        let Some(open) = offset_into_day(anchor, day_hours.start_minutes) else { continue };
        let Some(close) = offset_into_day(anchor, day_hours.end_minutes) else { continue };
        if close <= open {
            continue;
        }

        // Daily pressure is judged against the whole local day, not just
        // the open window, and against raw (unpadded) intervals.
        let day_window = BusyInterval::new(
            anchor.with_timezone(&Utc),
            date.succ_opt()
                .and_then(|next| local_day_start(tz, next))
                .or_else(|| anchor.checked_add_signed(Duration::days(1)))
                .map(|next_anchor| next_anchor.with_timezone(&Utc))
                .unwrap_or(TimePoint::MAX_UTC),
        );
        let day_busy: Vec<BusyInterval> =
            busy.iter().filter(|b| b.overlaps(&day_window)).copied().collect();
        if options.max_daily_bookings > 0 && day_busy.len() >= options.max_daily_bookings as usize {
            continue;
        }

        let padded: Vec<BusyInterval> = day_busy.iter().map(|b| b.padded(buffer)).collect();

        let mut slot_start = open;
        loop {
            let Some(slot_end) = slot_start.checked_add_signed(slot_len) else { break };
            if slot_end > close {
                break;
            }
            let start_utc = slot_start.with_timezone(&Utc);
            if start_utc >= now {
                let conflict = padded.iter().any(|b| b.contains_instant(start_utc));
                slots.push(AvailabilitySlot {
                    start: start_utc,
                    end: slot_end.with_timezone(&Utc),
                    available: !conflict,
                });
            }
            slot_start = slot_end;
        }
    }
    slots
}

/// First valid instant of `date` in `tz` — normally local midnight.
///
/// On spring-forward days whose midnight falls inside the DST gap the day
/// starts right after the gap; probing steps by half hours because real
/// gaps are 30–120 minutes and end on a half-hour boundary. An ambiguous
/// midnight (fall-back) resolves to the earlier instant.
pub fn local_day_start(tz: Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_time(NaiveTime::MIN);
    for probe_minutes in [0, 30, 60, 90, 120] {
        match tz.from_local_datetime(&(midnight + Duration::minutes(probe_minutes))) {
            LocalResult::Single(instant) => return Some(instant),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest),
            LocalResult::None => continue,
        }
    }
    None
}

/// `anchor` plus a minute offset, `None` when the result cannot be
/// represented.
pub(super) fn offset_into_day(anchor: DateTime<Tz>, minutes: Minutes) -> Option<DateTime<Tz>> {
    anchor.checked_add_signed(Duration::try_minutes(minutes)?)
}
