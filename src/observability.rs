//! Metric names recorded through the `metrics` facade. Exporter wiring
//! is the embedding application's job; without one, recording is free.

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: availability computations finished. Labels: outcome.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "slotgrid_availability_queries_total";

/// Histogram: end-to-end availability latency in seconds.
pub const AVAILABILITY_QUERY_DURATION_SECONDS: &str = "slotgrid_availability_query_duration_seconds";

/// Histogram: slots emitted per computation, counting unavailable ones.
pub const AVAILABILITY_SLOTS_RETURNED: &str = "slotgrid_availability_slots_returned";

// ── Degradation ─────────────────────────────────────────────────

/// Counter: secondary lookups that timed out or failed and were skipped.
/// Labels: source.
pub const DEGRADED_LOOKUPS_TOTAL: &str = "slotgrid_degraded_lookups_total";
