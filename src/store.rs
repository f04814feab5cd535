//! Collaborator interfaces the engine consumes but does not own, plus a
//! DashMap-backed implementation used by tests and benches.

use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

/// Failure surfaced by a collaborator store. The engine treats the text
/// as opaque; whether it is fatal depends on which store raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StoreError {}

// ── Collaborator traits ──────────────────────────────────────────

/// Read side of the service catalog.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn find_by_id(&self, id: Ulid) -> Result<Option<ServiceRecord>, StoreError>;
}

/// Read side of the staff roster.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find_by_id(&self, id: Ulid) -> Result<Option<StaffRecord>, StoreError>;
}

/// Bookings whose scheduled start lies in `[from, to]`, limited to
/// statuses that occupy time, optionally narrowed to one staff member.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_in_window(
        &self,
        service_id: Ulid,
        staff_id: Option<Ulid>,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<BookingRecord>, StoreError>;
}

/// Override records whose date falls on a calendar date of `[from, to]`
/// (bounds read as UTC dates, inclusive), optionally narrowed to one
/// staff member.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn find_in_window(
        &self,
        service_id: Ulid,
        staff_id: Option<Ulid>,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<OverrideRecord>, StoreError>;
}

/// Per-tenant organization settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn find_by_tenant(&self, tenant_id: &str) -> Result<Option<OrgSettings>, StoreError>;
}

fn staff_matches(query: Option<Ulid>, record: Option<Ulid>) -> bool {
    match query {
        None => true,
        Some(id) => record == Some(id),
    }
}

// ── In-memory implementation ─────────────────────────────────────

/// One concurrent map per collaborator role. Booking and override rows
/// are bucketed by service so window scans only touch one service's rows.
pub struct InMemoryStore {
    services: DashMap<Ulid, ServiceRecord>,
    staff: DashMap<Ulid, StaffRecord>,
    bookings: DashMap<Ulid, Vec<BookingRecord>>,
    overrides: DashMap<Ulid, Vec<OverrideRecord>>,
    settings: DashMap<String, OrgSettings>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            staff: DashMap::new(),
            bookings: DashMap::new(),
            overrides: DashMap::new(),
            settings: DashMap::new(),
        }
    }

    pub fn put_service(&self, record: ServiceRecord) {
        self.services.insert(record.id, record);
    }

    pub fn put_staff(&self, record: StaffRecord) {
        self.staff.insert(record.id, record);
    }

    pub fn push_booking(&self, record: BookingRecord) {
        self.bookings.entry(record.service_id).or_default().push(record);
    }

    pub fn push_override(&self, record: OverrideRecord) {
        self.overrides.entry(record.service_id).or_default().push(record);
    }

    pub fn put_settings(&self, tenant_id: impl Into<String>, settings: OrgSettings) {
        self.settings.insert(tenant_id.into(), settings);
    }
}

#[async_trait]
impl ServiceDirectory for InMemoryStore {
    async fn find_by_id(&self, id: Ulid) -> Result<Option<ServiceRecord>, StoreError> {
        Ok(self.services.get(&id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl StaffDirectory for InMemoryStore {
    async fn find_by_id(&self, id: Ulid) -> Result<Option<StaffRecord>, StoreError> {
        Ok(self.staff.get(&id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn find_in_window(
        &self,
        service_id: Ulid,
        staff_id: Option<Ulid>,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let Some(rows) = self.bookings.get(&service_id) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|b| b.status.occupies_time())
            .filter(|b| from <= b.scheduled_at && b.scheduled_at <= to)
            .filter(|b| staff_matches(staff_id, b.staff_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OverrideStore for InMemoryStore {
    async fn find_in_window(
        &self,
        service_id: Ulid,
        staff_id: Option<Ulid>,
        from: TimePoint,
        to: TimePoint,
    ) -> Result<Vec<OverrideRecord>, StoreError> {
        let Some(rows) = self.overrides.get(&service_id) else {
            return Ok(Vec::new());
        };
        let first = from.date_naive();
        let last = to.date_naive();
        Ok(rows
            .iter()
            .filter(|o| first <= o.date && o.date <= last)
            .filter(|o| staff_matches(staff_id, o.staff_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn find_by_tenant(&self, tenant_id: &str) -> Result<Option<OrgSettings>, StoreError> {
        Ok(self.settings.get(tenant_id).map(|entry| entry.value().clone()))
    }
}
