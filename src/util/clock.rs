//! Wall-clock access, isolated so tests can reason about it explicitly.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as whole epoch seconds, floored.
///
/// A single call's result is meant to be reused for every point in one poll
/// batch (spec invariant: all points in a batch share one timestamp) — callers
/// must not call this per-point.
#[must_use]
pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_positive_and_recent() {
        let now = now_epoch_seconds();
        assert!(now > 1_700_000_000);
    }
}
