// Shared wall-clock helper: every timestamp column in the data model (§3)
// is "seconds since epoch, floating point", so every crate that writes one
// goes through this instead of hand-rolling `SystemTime` arithmetic.

use chrono::Utc;

/// Current time as seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
