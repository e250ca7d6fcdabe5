//! Time utilities

use chrono::{DateTime, Utc};

/// Seconds left before a participant may submit again, if any
pub fn cooldown_remaining(
    last: DateTime<Utc>,
    cooldown_secs: i64,
    now: DateTime<Utc>,
) -> Option<i64> {
    let elapsed = (now - last).num_seconds();
    let remaining = cooldown_secs - elapsed.max(0);
    (remaining > 0).then_some(remaining)
}
