//! Sliding-window rate limiting per recipient/channel pair.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Tracks successful send timestamps per `recipientId_channel` key.
///
/// Timestamps are recorded only for successful sends; skipped and failed
/// attempts never consume budget. Engine-owned state, injected into the
/// dispatcher rather than living in process-wide globals.
#[derive(Default)]
pub struct RateLimitTracker {
    sends: DashMap<String, Vec<DateTime<Utc>>>,
}

impl RateLimitTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prunes timestamps older than `window` and reports whether another send
    /// is allowed under `max_per_window`.
    pub fn check_allowed(
        &self,
        key: &str,
        window: Duration,
        max_per_window: u32,
        now: DateTime<Utc>,
    ) -> bool {
        let mut entry = self.sends.entry(key.to_string()).or_default();
        entry.retain(|sent| {
            now.signed_duration_since(*sent)
                .to_std()
                .map(|age| age < window)
                .unwrap_or(true)
        });
        (entry.len() as u32) < max_per_window
    }

    /// Records a successful send.
    pub fn record_send(&self, key: &str, now: DateTime<Utc>) {
        self.sends.entry(key.to_string()).or_default().push(now);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(300);

    #[test]
    fn allows_up_to_the_limit() {
        let tracker = RateLimitTracker::new();
        let now = Utc::now();

        assert!(tracker.check_allowed("ops_email", WINDOW, 2, now));
        tracker.record_send("ops_email", now);

        assert!(tracker.check_allowed("ops_email", WINDOW, 2, now));
        tracker.record_send("ops_email", now);

        assert!(!tracker.check_allowed("ops_email", WINDOW, 2, now));
    }

    #[test]
    fn window_expiry_frees_budget() {
        let tracker = RateLimitTracker::new();
        let now = Utc::now();

        tracker.record_send("ops_email", now);
        tracker.record_send("ops_email", now);
        assert!(!tracker.check_allowed("ops_email", WINDOW, 2, now));

        let later = now + ChronoDuration::seconds(301);
        assert!(tracker.check_allowed("ops_email", WINDOW, 2, later));
    }

    #[test]
    fn keys_are_independent() {
        let tracker = RateLimitTracker::new();
        let now = Utc::now();

        tracker.record_send("ops_email", now);
        tracker.record_send("ops_email", now);

        assert!(!tracker.check_allowed("ops_email", WINDOW, 2, now));
        assert!(tracker.check_allowed("ops_telegram", WINDOW, 2, now));
    }
}
