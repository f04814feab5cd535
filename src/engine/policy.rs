use chrono_tz::Tz;

use crate::model::{BusinessHours, Minutes, OrgSettings, ServiceRecord, StaffRecord};

use super::hours;

// ── Effective-policy resolution ───────────────────────────────────

/// The settings one availability computation actually runs with, after
/// walking the staff → service → organization-default chains.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePolicy {
    pub business_hours: BusinessHours,
    pub buffer_minutes: Minutes,
    pub max_daily_bookings: u32,
    /// `None` means all arithmetic stays in UTC.
    pub time_zone: Option<Tz>,
}

/// Pure selection over already-fetched inputs; each field is an ordered
/// candidate chain and the first hit wins.
///
/// Hours: staff working hours (normalized, non-empty) → service hours →
/// built-in weekday default. Buffer: staff (an explicit 0 counts) →
/// service → 0. Daily cap: staff cap if positive → service cap if
/// positive → 0 = unlimited. Zone: caller request → staff → org default
/// → unset.
pub fn resolve(
    service: &ServiceRecord,
    staff: Option<&StaffRecord>,
    org: Option<&OrgSettings>,
    requested_tz: Option<Tz>,
) -> EffectivePolicy {
    let business_hours = staff
        .and_then(|member| member.working_hours.as_ref())
        .and_then(hours::normalize)
        .or_else(|| service.business_hours.as_ref().and_then(hours::normalize))
        .unwrap_or_else(BusinessHours::weekday_default);

    let buffer_minutes = staff
        .and_then(|member| member.buffer_minutes)
        .or(service.buffer_minutes)
        .unwrap_or(0);

    let max_daily_bookings = staff
        .and_then(|member| member.max_concurrent_bookings)
        .filter(|&cap| cap > 0)
        .or_else(|| service.max_daily_bookings.filter(|&cap| cap > 0))
        .unwrap_or(0);

    let time_zone = requested_tz
        .or_else(|| staff.and_then(StaffRecord::parsed_time_zone))
        .or_else(|| org.and_then(OrgSettings::parsed_time_zone));

    EffectivePolicy { business_hours, buffer_minutes, max_daily_bookings, time_zone }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ulid::Ulid;

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

    fn staff() -> StaffRecord {
        StaffRecord {
            id: Ulid::new(),
            working_hours: None,
            buffer_minutes: None,
            max_concurrent_bookings: None,
            is_available: None,
            time_zone: None,
        }
    }

    fn org(zone: &str) -> OrgSettings {
        OrgSettings { default_time_zone: Some(zone.into()) }
    }

    // ── business hours ────────────────────────────────────

    #[test]
    fn staff_hours_win_over_service() {
        let mut svc = service();
        svc.business_hours = Some(json!({ "1": "08:00-12:00" }));
        let mut member = staff();
        member.working_hours = Some(json!({ "2": "10:00-14:00" }));

        let policy = resolve(&svc, Some(&member), None, None);
        assert!(policy.business_hours.get(1).is_none());
        assert_eq!(policy.business_hours.get(2).unwrap().start_minutes, 600);
    }

    #[test]
    fn empty_staff_hours_fall_to_service() {
        let mut svc = service();
        svc.business_hours = Some(json!({ "1": "08:00-12:00" }));
        let mut member = staff();
        member.working_hours = Some(json!({})); // normalizes to nothing

        let policy = resolve(&svc, Some(&member), None, None);
        assert_eq!(policy.business_hours.get(1).unwrap().start_minutes, 480);
    }

    #[test]
    fn no_hours_anywhere_uses_weekday_default() {
        let policy = resolve(&service(), None, None, None);
        assert_eq!(policy.business_hours, BusinessHours::weekday_default());
    }

    // ── buffer ────────────────────────────────────────────

    #[test]
    fn staff_buffer_wins() {
        let mut svc = service();
        svc.buffer_minutes = Some(30);
        let mut member = staff();
        member.buffer_minutes = Some(10);

        assert_eq!(resolve(&svc, Some(&member), None, None).buffer_minutes, 10);
        assert_eq!(resolve(&svc, None, None, None).buffer_minutes, 30);
    }

    #[test]
    fn explicit_zero_staff_buffer_stops_fallback() {
        let mut svc = service();
        svc.buffer_minutes = Some(30);
        let mut member = staff();
        member.buffer_minutes = Some(0);

        assert_eq!(resolve(&svc, Some(&member), None, None).buffer_minutes, 0);
    }

    #[test]
    fn no_buffer_anywhere_is_zero() {
        assert_eq!(resolve(&service(), Some(&staff()), None, None).buffer_minutes, 0);
    }

    // ── daily cap ─────────────────────────────────────────

    #[test]
    fn positive_staff_cap_wins() {
        let mut svc = service();
        svc.max_daily_bookings = Some(8);
        let mut member = staff();
        member.max_concurrent_bookings = Some(3);

        assert_eq!(resolve(&svc, Some(&member), None, None).max_daily_bookings, 3);
    }

    #[test]
    fn zero_staff_cap_falls_to_service() {
        let mut svc = service();
        svc.max_daily_bookings = Some(8);
        let mut member = staff();
        member.max_concurrent_bookings = Some(0);

        assert_eq!(resolve(&svc, Some(&member), None, None).max_daily_bookings, 8);
    }

    #[test]
    fn zero_caps_everywhere_mean_unlimited() {
        let mut svc = service();
        svc.max_daily_bookings = Some(0);
        assert_eq!(resolve(&svc, None, None, None).max_daily_bookings, 0);
        assert_eq!(resolve(&service(), None, None, None).max_daily_bookings, 0);
    }

    // ── timezone ──────────────────────────────────────────

    #[test]
    fn requested_zone_beats_everything() {
        let mut member = staff();
        member.time_zone = Some("America/New_York".into());
        let settings = org("Europe/Berlin");

        let policy = resolve(
            &service(),
            Some(&member),
            Some(&settings),
            Some(chrono_tz::Asia::Tokyo),
        );
        assert_eq!(policy.time_zone, Some(chrono_tz::Asia::Tokyo));
    }

    #[test]
    fn staff_zone_beats_org_default() {
        let mut member = staff();
        member.time_zone = Some("America/New_York".into());
        let settings = org("Europe/Berlin");

        let policy = resolve(&service(), Some(&member), Some(&settings), None);
        assert_eq!(policy.time_zone, Some(chrono_tz::America::New_York));
    }

    #[test]
    fn malformed_staff_zone_falls_through() {
        let mut member = staff();
        member.time_zone = Some("Not/A_Zone".into());
        let settings = org("Europe/Berlin");

        let policy = resolve(&service(), Some(&member), Some(&settings), None);
        assert_eq!(policy.time_zone, Some(chrono_tz::Europe::Berlin));
    }

    #[test]
    fn unresolved_zone_stays_unset() {
        let policy = resolve(&service(), Some(&staff()), None, None);
        assert!(policy.time_zone.is_none());
        let bad_org = OrgSettings { default_time_zone: Some("".into()) };
        let policy = resolve(&service(), None, Some(&bad_org), None);
        assert!(policy.time_zone.is_none());
    }
}
