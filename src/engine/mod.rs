mod busy;
mod error;
pub mod hours;
pub mod policy;
pub mod slots;

pub use error::EngineError;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use ulid::Ulid;

use crate::limits::MAX_WINDOW_DAYS;
use crate::model::*;
use crate::store::{
    BookingStore, OverrideStore, ServiceDirectory, SettingsStore, StaffDirectory, StoreError,
};

/// Availability computation over five external collaborator stores.
///
/// The engine owns no data and no background tasks — every call fetches
/// what it needs, computes, and forgets, so concurrent calls never
/// contend.
pub struct Engine {
    services: Arc<dyn ServiceDirectory>,
    staff: Arc<dyn StaffDirectory>,
    bookings: Arc<dyn BookingStore>,
    overrides: Arc<dyn OverrideStore>,
    settings: Arc<dyn SettingsStore>,
}

/// Race `lookup` against a deadline. `None` uniformly means "proceed
/// without this data", whether the cause was an error or the clock.
pub(super) async fn best_effort<T>(
    wait: std::time::Duration,
    source: &'static str,
    lookup: impl Future<Output = Result<T, StoreError>>,
) -> Option<T> {
    match tokio::time::timeout(wait, lookup).await {
        Ok(Ok(data)) => Some(data),
        Ok(Err(e)) => {
            metrics::counter!(crate::observability::DEGRADED_LOOKUPS_TOTAL, "source" => source)
                .increment(1);
            tracing::warn!("{source} lookup failed, proceeding without: {e}");
            None
        }
        Err(_) => {
            metrics::counter!(crate::observability::DEGRADED_LOOKUPS_TOTAL, "source" => source)
                .increment(1);
            tracing::warn!("{source} lookup exceeded {wait:?}, proceeding without");
            None
        }
    }
}

impl Engine {
    pub fn new(
        services: Arc<dyn ServiceDirectory>,
        staff: Arc<dyn StaffDirectory>,
        bookings: Arc<dyn BookingStore>,
        overrides: Arc<dyn OverrideStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self { services, staff, bookings, overrides, settings }
    }

    /// Wire every collaborator role to one shared backing store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ServiceDirectory + StaffDirectory + BookingStore + OverrideStore + SettingsStore + 'static,
    {
        Self {
            services: store.clone(),
            staff: store.clone(),
            bookings: store.clone(),
            overrides: store.clone(),
            settings: store,
        }
    }

    /// Compute the bookable grid for a service over `[from, to]`.
    ///
    /// `slot_minutes` falls back to the service base duration; `staff_id`
    /// narrows policy and busy data to one staff member. Policy-level
    /// fields in `options` (hours, buffer, capacity) are recomputed from
    /// the directory records; `now`, `skip_weekends` and `time_zone` are
    /// honored as given.
    ///
    /// A missing or inactive service, or staff explicitly out of
    /// rotation, yields an empty grid rather than an error. Only the
    /// service directory and the booking store can fail the call.
    pub async fn compute_availability(
        &self,
        service_id: Ulid,
        from: TimePoint,
        to: TimePoint,
        slot_minutes: Option<Minutes>,
        staff_id: Option<Ulid>,
        options: &AvailabilityOptions,
    ) -> Result<Vec<AvailabilitySlot>, EngineError> {
        let started = Instant::now();
        let result = self
            .availability_inner(service_id, from, to, slot_minutes, staff_id, options)
            .await;
        metrics::histogram!(crate::observability::AVAILABILITY_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(slots) => {
                metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL, "outcome" => "ok")
                    .increment(1);
                metrics::histogram!(crate::observability::AVAILABILITY_SLOTS_RETURNED)
                    .record(slots.len() as f64);
            }
            Err(_) => {
                metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL, "outcome" => "error")
                    .increment(1);
            }
        }
        result
    }

    async fn availability_inner(
        &self,
        service_id: Ulid,
        from: TimePoint,
        to: TimePoint,
        slot_minutes: Option<Minutes>,
        staff_id: Option<Ulid>,
        options: &AvailabilityOptions,
    ) -> Result<Vec<AvailabilitySlot>, EngineError> {
        if to.signed_duration_since(from) > Duration::days(MAX_WINDOW_DAYS) {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }

        let service = match self.services.find_by_id(service_id).await? {
            Some(service) if service.is_active() => service,
            Some(_) => {
                tracing::debug!("service {service_id} inactive, returning empty grid");
                return Ok(Vec::new());
            }
            None => return Ok(Vec::new()),
        };

        let staff = self.resolve_staff(staff_id).await;
        if let Some(staff) = &staff
            && staff.is_available == Some(false)
        {
            return Ok(Vec::new());
        }
        let staff_scope = staff.as_ref().map(|record| record.id);

        // Org settings are consulted only when nothing upstream fixed a
        // zone; their absence just means UTC arithmetic.
        let requested_tz = options.time_zone;
        let staff_tz = staff.as_ref().and_then(StaffRecord::parsed_time_zone);
        let settings = if requested_tz.or(staff_tz).is_none() {
            self.resolve_settings(&service.tenant_id).await
        } else {
            None
        };

        let policy = policy::resolve(&service, staff.as_ref(), settings.as_ref(), requested_tz);
        let base_duration = service.duration_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
        let step = slot_minutes.unwrap_or(base_duration);
        let tz = policy.time_zone.unwrap_or(Tz::UTC);

        let busy = self
            .collect_busy(&service, staff_scope, from, to, tz, base_duration)
            .await?;

        let generation = AvailabilityOptions {
            buffer_minutes: policy.buffer_minutes,
            skip_weekends: options.skip_weekends,
            max_daily_bookings: policy.max_daily_bookings,
            business_hours: Some(policy.business_hours),
            now: Some(options.now.unwrap_or_else(Utc::now)),
            time_zone: policy.time_zone,
        };
        Ok(slots::generate(from, to, step, &busy, &generation))
    }

    /// Staff context is advisory: a failed or empty lookup drops back to
    /// service-level computation instead of failing the request.
    async fn resolve_staff(&self, staff_id: Option<Ulid>) -> Option<StaffRecord> {
        let id = staff_id?;
        match self.staff.find_by_id(id).await {
            Ok(found) => found,
            Err(e) => {
                metrics::counter!(crate::observability::DEGRADED_LOOKUPS_TOTAL, "source" => "staff directory")
                    .increment(1);
                tracing::warn!("staff {id} lookup failed, computing service-only: {e}");
                None
            }
        }
    }

    async fn resolve_settings(&self, tenant_id: &str) -> Option<OrgSettings> {
        match self.settings.find_by_tenant(tenant_id).await {
            Ok(found) => found,
            Err(e) => {
                metrics::counter!(crate::observability::DEGRADED_LOOKUPS_TOTAL, "source" => "settings store")
                    .increment(1);
                tracing::warn!("settings lookup for tenant {tenant_id} failed: {e}");
                None
            }
        }
    }
}
