use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// UTC instant — the only absolute time type.
pub type TimePoint = DateTime<Utc>;

/// Whole minutes — the unit of all policy arithmetic.
pub type Minutes = i64;

/// Slot length assumed when neither the caller nor the service supplies one.
pub const DEFAULT_SLOT_MINUTES: Minutes = 60;

/// Half-open committed range `[start, end)` — a booking or a manually
/// blocked window. Built fresh on every computation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: TimePoint,
    pub end: TimePoint,
}

impl BusyInterval {
    pub fn new(start: TimePoint, end: TimePoint) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &BusyInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: TimePoint) -> bool {
        self.start <= t && t < self.end
    }

    /// The interval grown by `minutes` on both ends. Zero is the identity;
    /// a pad too large to place on the calendar leaves the interval
    /// unpadded.
    pub fn padded(&self, minutes: Minutes) -> BusyInterval {
        let Some(pad) = Duration::try_minutes(minutes) else {
            return *self;
        };
        match (self.start.checked_sub_signed(pad), self.end.checked_add_signed(pad)) {
            (Some(start), Some(end)) => BusyInterval { start, end },
            _ => *self,
        }
    }
}

/// Open/close offsets in minutes since the local day anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub start_minutes: Minutes,
    pub end_minutes: Minutes,
}

/// Canonical weekly hours, indexed 0=Sunday … 6=Saturday.
/// `None` for a weekday means closed. Default is closed everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusinessHours {
    days: [Option<DayHours>; 7],
}

impl BusinessHours {
    /// Monday–Friday 09:00–17:00, the built-in fallback week.
    pub fn weekday_default() -> Self {
        let mut hours = Self::default();
        for weekday in 1..=5 {
            hours.set(weekday, DayHours { start_minutes: 9 * 60, end_minutes: 17 * 60 });
        }
        hours
    }

    /// Out-of-range weekdays are ignored.
    pub fn set(&mut self, weekday: usize, hours: DayHours) {
        if let Some(slot) = self.days.get_mut(weekday) {
            *slot = Some(hours);
        }
    }

    pub fn get(&self, weekday: usize) -> Option<DayHours> {
        self.days.get(weekday).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }
}

/// Knobs for slot generation. `Default` leaves everything unset: no
/// buffer, weekends allowed, unlimited capacity, fallback hours, the
/// real clock, UTC arithmetic.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityOptions {
    /// Pads every busy interval symmetrically before conflict checks.
    pub buffer_minutes: Minutes,
    /// Forces Saturday/Sunday closed even when hours cover them.
    pub skip_weekends: bool,
    /// Busy intervals allowed per day before the whole day is excluded
    /// (0 = unlimited).
    pub max_daily_bookings: u32,
    pub business_hours: Option<BusinessHours>,
    /// Reference instant for the past-slot cutoff.
    pub now: Option<TimePoint>,
    /// IANA zone governing day boundaries and hour offsets.
    pub time_zone: Option<Tz>,
}

/// One candidate booking window. Boundaries are UTC instants regardless
/// of the zone used for generation; unavailable slots are emitted too so
/// callers can render a fully booked grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub start: TimePoint,
    pub end: TimePoint,
    pub available: bool,
}

// ── Collaborator records ─────────────────────────────────────────

/// A bookable service as the directory stores it. `business_hours` stays
/// raw JSON; normalization happens at policy resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: Ulid,
    pub tenant_id: String,
    pub duration_minutes: Option<Minutes>,
    /// Lifecycle status string, e.g. "ACTIVE". Takes precedence over
    /// `active` when present.
    pub status: Option<String>,
    /// Legacy boolean flag consulted only when `status` is absent.
    pub active: Option<bool>,
    pub buffer_minutes: Option<Minutes>,
    pub max_daily_bookings: Option<u32>,
    pub business_hours: Option<serde_json::Value>,
}

impl ServiceRecord {
    pub fn is_active(&self) -> bool {
        match &self.status {
            Some(status) => status.trim().eq_ignore_ascii_case("active"),
            None => self.active != Some(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: Ulid,
    pub working_hours: Option<serde_json::Value>,
    pub buffer_minutes: Option<Minutes>,
    pub max_concurrent_bookings: Option<u32>,
    /// `Some(false)` means explicitly taken out of rotation.
    pub is_available: Option<bool>,
    /// Raw IANA zone name; counted only when it parses.
    pub time_zone: Option<String>,
}

impl StaffRecord {
    pub fn parsed_time_zone(&self) -> Option<Tz> {
        parse_zone(self.time_zone.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Pending and confirmed bookings occupy time; the rest do not.
    pub fn occupies_time(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Ulid,
    pub service_id: Ulid,
    pub staff_id: Option<Ulid>,
    pub scheduled_at: TimePoint,
    /// Falls back to the service base duration when absent.
    pub duration_minutes: Option<Minutes>,
    pub status: BookingStatus,
}

/// Manually managed availability entry for one calendar day. Clock
/// strings are local wall times on `date` in the effective zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub id: Ulid,
    pub service_id: Ulid,
    pub staff_id: Option<Ulid>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub available: bool,
    pub max_bookings: Option<u32>,
    pub current_bookings: Option<u32>,
}

impl OverrideRecord {
    /// True when the record removes time from availability: explicitly
    /// unavailable, or an available window whose count reached its cap.
    pub fn is_blocking(&self) -> bool {
        if !self.available {
            return true;
        }
        matches!(
            (self.max_bookings, self.current_bookings),
            (Some(max), Some(current)) if max > 0 && current >= max
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSettings {
    pub default_time_zone: Option<String>,
}

impl OrgSettings {
    pub fn parsed_time_zone(&self) -> Option<Tz> {
        parse_zone(self.default_time_zone.as_deref())
    }
}

fn parse_zone(raw: Option<&str>) -> Option<Tz> {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .and_then(|name| name.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> TimePoint {
        Utc.with_ymd_and_hms(2026, 1, 5, h, m, 0).single().unwrap()
    }

    #[test]
    fn interval_basics() {
        let b = BusyInterval::new(at(10, 0), at(11, 0));
        assert!(b.contains_instant(at(10, 0)));
        assert!(b.contains_instant(at(10, 59)));
        assert!(!b.contains_instant(at(11, 0))); // half-open
    }

    #[test]
    fn interval_overlap() {
        let a = BusyInterval::new(at(10, 0), at(11, 0));
        let b = BusyInterval::new(at(10, 30), at(11, 30));
        let c = BusyInterval::new(at(11, 0), at(12, 0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn interval_padding() {
        let b = BusyInterval::new(at(10, 0), at(11, 0));
        let padded = b.padded(15);
        assert_eq!(padded.start, at(9, 45));
        assert_eq!(padded.end, at(11, 15));
        assert_eq!(b.padded(0), b);
    }

    #[test]
    fn oversized_pad_is_ignored() {
        let b = BusyInterval::new(at(10, 0), at(11, 0));
        assert_eq!(b.padded(i64::MAX), b);
        assert_eq!(b.padded(i64::MIN), b);
        // representable as a duration, but off the calendar when applied
        assert_eq!(b.padded(100_000_000_000_000), b);
    }

    #[test]
    fn default_week_is_monday_to_friday() {
        let hours = BusinessHours::weekday_default();
        assert!(hours.get(0).is_none()); // Sunday
        assert!(hours.get(6).is_none()); // Saturday
        for weekday in 1..=5 {
            let day = hours.get(weekday).unwrap();
            assert_eq!(day.start_minutes, 540);
            assert_eq!(day.end_minutes, 1020);
        }
    }

    #[test]
    fn hours_set_get_bounds() {
        let mut hours = BusinessHours::default();
        assert!(hours.is_empty());
        hours.set(3, DayHours { start_minutes: 600, end_minutes: 720 });
        hours.set(9, DayHours { start_minutes: 0, end_minutes: 60 }); // ignored
        assert_eq!(hours.get(3).unwrap().start_minutes, 600);
        assert!(hours.get(9).is_none());
        assert!(!hours.is_empty());
    }

    #[test]
    fn service_active_via_status_string() {
        let mut svc = service();
        svc.status = Some("ACTIVE".into());
        assert!(svc.is_active());
        svc.status = Some("active".into());
        assert!(svc.is_active());
        svc.status = Some("INACTIVE".into());
        assert!(!svc.is_active());
        // status wins even when the flag says otherwise
        svc.active = Some(true);
        assert!(!svc.is_active());
    }

    #[test]
    fn service_active_via_flag() {
        let mut svc = service();
        assert!(svc.is_active()); // nothing set at all
        svc.active = Some(false);
        assert!(!svc.is_active());
        svc.active = Some(true);
        assert!(svc.is_active());
    }

    #[test]
    fn staff_zone_parses_or_falls_out() {
        let mut staff = StaffRecord {
            id: Ulid::new(),
            working_hours: None,
            buffer_minutes: None,
            max_concurrent_bookings: None,
            is_available: None,
            time_zone: Some("Europe/Berlin".into()),
        };
        assert_eq!(staff.parsed_time_zone(), Some(chrono_tz::Europe::Berlin));
        staff.time_zone = Some("  America/New_York ".into());
        assert_eq!(staff.parsed_time_zone(), Some(chrono_tz::America::New_York));
        staff.time_zone = Some("Mars/Olympus_Mons".into());
        assert!(staff.parsed_time_zone().is_none());
        staff.time_zone = Some("   ".into());
        assert!(staff.parsed_time_zone().is_none());
        staff.time_zone = None;
        assert!(staff.parsed_time_zone().is_none());
    }

    #[test]
    fn override_blocking_matrix() {
        let mut rec = OverrideRecord {
            id: Ulid::new(),
            service_id: Ulid::new(),
            staff_id: None,
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            start_time: "09:00".into(),
            end_time: "12:00".into(),
            available: false,
            max_bookings: None,
            current_bookings: None,
        };
        assert!(rec.is_blocking()); // explicitly unavailable

        rec.available = true;
        assert!(!rec.is_blocking());

        rec.max_bookings = Some(3);
        rec.current_bookings = Some(2);
        assert!(!rec.is_blocking()); // under capacity
        rec.current_bookings = Some(3);
        assert!(rec.is_blocking()); // at capacity
        rec.current_bookings = Some(4);
        assert!(rec.is_blocking());

        rec.max_bookings = Some(0); // zero cap means uncapped
        assert!(!rec.is_blocking());
        rec.max_bookings = None;
        assert!(!rec.is_blocking());
    }

    #[test]
    fn booking_status_occupancy() {
        assert!(BookingStatus::Pending.occupies_time());
        assert!(BookingStatus::Confirmed.occupies_time());
        assert!(!BookingStatus::Completed.occupies_time());
        assert!(!BookingStatus::Cancelled.occupies_time());
        let json = serde_json::to_string(&BookingStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMED\"");
    }

    #[test]
    fn slot_serializes_as_utc_iso() {
        let slot = AvailabilitySlot {
            start: at(9, 0),
            end: at(9, 30),
            available: true,
        };
        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["start"], "2026-01-05T09:00:00Z");
        assert_eq!(value["end"], "2026-01-05T09:30:00Z");
        assert_eq!(value["available"], true);
    }

    fn service() -> ServiceRecord {
        ServiceRecord {
            id: Ulid::new(),
            tenant_id: "acme".into(),
            duration_minutes: Some(30),
            status: None,
            active: None,
            buffer_minutes: None,
            max_daily_bookings: None,
            business_hours: None,
        }
    }
}
