//! Single-shot, rearmable debounce timer.
//!
//! The caller supplies the clock so the timer can be driven from an event
//! loop tick and tested without sleeping.

use std::time::{Duration, Instant};

/// Quiet period used for search boxes.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Holds at most one pending value and releases it once input has been
/// quiet for the configured interval.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    interval: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.interval));
    }

    /// Release the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Drop the pending value without releasing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_releases_after_quiet_period() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(SEARCH_DEBOUNCE);

        d.push("a", t0);
        assert_eq!(d.poll(t0 + Duration::from_millis(499)), None);
        assert_eq!(d.poll(t0 + Duration::from_millis(500)), Some("a"));
        assert_eq!(d.poll(t0 + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_push_restarts_timer() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(SEARCH_DEBOUNCE);

        d.push("a", t0);
        d.push("ab", t0 + Duration::from_millis(400));
        assert_eq!(d.poll(t0 + Duration::from_millis(600)), None);
        assert_eq!(d.poll(t0 + Duration::from_millis(900)), Some("ab"));
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(SEARCH_DEBOUNCE);
        d.push(1, t0);
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.poll(t0 + Duration::from_secs(1)), None);
    }

    proptest! {
        #[test]
        fn rapid_pushes_release_only_the_last(gaps in prop::collection::vec(0u64..100, 1..10)) {
            let t0 = Instant::now();
            let mut d = Debouncer::new(SEARCH_DEBOUNCE);
            let mut now = t0;
            let mut released = Vec::new();

            for (i, gap) in gaps.iter().enumerate() {
                now += Duration::from_millis(*gap);
                if let Some(v) = d.poll(now) {
                    released.push(v);
                }
                d.push(i, now);
            }
            if let Some(v) = d.poll(now + SEARCH_DEBOUNCE) {
                released.push(v);
            }

            prop_assert_eq!(released, vec![gaps.len() - 1]);
        }
    }
}
