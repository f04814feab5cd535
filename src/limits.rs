//! Hard limits guarding a single availability request.

/// Widest `from`→`to` span one query may cover, in calendar days.
pub const MAX_WINDOW_DAYS: i64 = 366;

/// Furthest a business-hours offset may reach past its day anchor, in
/// minutes. Entries beyond it are treated as malformed.
pub const MAX_DAY_OFFSET_MINUTES: i64 = 7 * 24 * 60;

/// Bounded wait for the override store before proceeding without it.
pub const OVERRIDE_FETCH_TIMEOUT_MS: u64 = 200;
