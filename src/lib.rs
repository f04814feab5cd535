//! Booking availability engine: computes which fixed-duration slots are
//! bookable for a service, optionally narrowed to one staff member, over
//! a date range — reconciling business-hours policy, buffers around
//! existing commitments, per-day capacity, timezone-correct "now"
//! cutoffs, and layered configuration fallback (staff, then service,
//! then organization default).
//!
//! [`Engine`] orchestrates five collaborator stores (see [`store`]) and
//! degrades gracefully when secondary sources are slow or missing. The
//! slot arithmetic itself lives in pure functions under [`engine`], so
//! it can be driven directly without any store wiring.

pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod store;

pub use engine::{Engine, EngineError};
