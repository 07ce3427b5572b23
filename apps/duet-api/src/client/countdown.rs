//! Room countdown helpers. The server never pushes expiry; clients count
//! down from `expires_at` themselves.

use chrono::{DateTime, Utc};

/// Whole seconds until `expires_at`, clamped at zero.
pub fn seconds_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_seconds().max(0)
}

/// Render a countdown as `MM:SS`.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
