//! Heartbeat staleness rules.

use crate::types::Timestamp;

/// Default staleness window in seconds.
pub const DEFAULT_STALE_WINDOW_SECS: i64 = 10;

/// Whether a node counts as active for scheduling purposes.
///
/// Requires the administrative `is_active` flag. A node that has never
/// sent a heartbeat (`last_seen` is `None`) is given the benefit of the
/// doubt; otherwise its last heartbeat must fall inside `stale_window`.
pub fn is_active_for_scheduling(
    is_active: bool,
    last_seen: Option<Timestamp>,
    now: Timestamp,
    stale_window: chrono::Duration,
) -> bool {
    is_active && last_seen.is_none_or(|seen| seen >= now - stale_window)
}

/// Whether a node that has reported at least once has gone quiet.
pub fn is_stale(last_seen: Option<Timestamp>, now: Timestamp, stale_window: chrono::Duration) -> bool {
    last_seen.is_some_and(|seen| seen < now - stale_window)
}
