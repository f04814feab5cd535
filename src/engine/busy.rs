use chrono::{Duration, Utc};
use chrono_tz::Tz;
use ulid::Ulid;

use crate::limits::OVERRIDE_FETCH_TIMEOUT_MS;
use crate::model::*;

use super::hours::parse_clock_minutes;
use super::slots::{local_day_start, offset_into_day};
use super::{best_effort, Engine, EngineError};

impl Engine {
    /// Assemble the busy calendar for one request: occupied bookings plus
    /// blocking override windows, concatenated without merging.
    ///
    /// Bookings are load-bearing — a store failure propagates. Overrides
    /// are fetched under a bounded wait and dropped wholesale on timeout
    /// or error.
    pub(super) async fn collect_busy(
        &self,
        service: &ServiceRecord,
        staff_id: Option<Ulid>,
        from: TimePoint,
        to: TimePoint,
        tz: Tz,
        base_duration: Minutes,
    ) -> Result<Vec<BusyInterval>, EngineError> {
        let bookings = self
            .bookings
            .find_in_window(service.id, staff_id, from, to)
            .await?;
        let mut busy: Vec<BusyInterval> = bookings
            .iter()
            .filter_map(|booking| booking_interval(booking, base_duration))
            .collect();

        let overrides = best_effort(
            std::time::Duration::from_millis(OVERRIDE_FETCH_TIMEOUT_MS),
            "override store",
            self.overrides.find_in_window(service.id, staff_id, from, to),
        )
        .await
        .unwrap_or_default();
        for record in overrides.iter().filter(|record| record.is_blocking()) {
            if let Some(interval) = override_interval(record, tz) {
                busy.push(interval);
            }
        }

        tracing::debug!(
            "busy for service {}: {} bookings, {} intervals total",
            service.id,
            bookings.len(),
            busy.len()
        );
        Ok(busy)
    }
}

/// `[scheduled_at, scheduled_at + duration)`, falling back to the service
/// base duration when the booking carries none. A duration that cannot be
/// placed on the calendar drops the booking.
fn booking_interval(booking: &BookingRecord, base_duration: Minutes) -> Option<BusyInterval> {
    let minutes = booking.duration_minutes.unwrap_or(base_duration);
    let end = booking
        .scheduled_at
        .checked_add_signed(Duration::try_minutes(minutes)?)?;
    Some(BusyInterval::new(booking.scheduled_at, end))
}

/// Place an override's wall-clock window on its date in `tz`. A record
/// whose clock strings do not parse, whose date has no valid day start,
/// or whose window cannot be placed on the calendar contributes nothing.
/// Inverted windows are kept as-is: they can never contain a slot start,
/// but they still count toward daily pressure, matching how a stored row
/// reads.
fn override_interval(record: &OverrideRecord, tz: Tz) -> Option<BusyInterval> {
    let anchor = local_day_start(tz, record.date)?;
    let start = offset_into_day(anchor, parse_clock_minutes(&record.start_time)?)?;
    let end = offset_into_day(anchor, parse_clock_minutes(&record.end_time)?)?;
    Some(BusyInterval::new(
        start.with_timezone(&Utc),
        end.with_timezone(&Utc),
    ))
}
