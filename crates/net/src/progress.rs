//! Progress percentage computation and throttling

use crate::request::ProgressCallback;
use std::panic::{self, AssertUnwindSafe};

/// Whole percentage of `received` out of `expected`, rounded down
#[must_use]
pub fn percent_of(received: u64, expected: u64) -> u8 {
    if expected == 0 {
        return 100;
    }
    let percent = u128::from(received) * 100 / u128::from(expected);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// Drops progress updates that are too close to the last delivered one.
///
/// A value passes when it exceeds the last delivered value by more than
/// `step`, or when it is 100 and 100 has not been delivered yet.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    step: u8,
    last: Option<u8>,
}

impl ProgressThrottle {
    #[must_use]
    pub fn new(step: u8) -> Self {
        Self { step, last: None }
    }

    /// Record a value that was delivered outside the throttle
    pub fn mark(&mut self, percent: u8) {
        self.last = Some(percent);
    }

    /// Returns the value to deliver, if any
    pub fn observe(&mut self, percent: u8) -> Option<u8> {
        let pass = match self.last {
            None => true,
            Some(last) if percent == 100 => last < 100,
            Some(last) => u16::from(percent) > u16::from(last) + u16::from(self.step),
        };
        if pass {
            self.last = Some(percent);
            Some(percent)
        } else {
            None
        }
    }

    #[must_use]
    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// Invoke a progress listener, containing any panic it raises
pub(crate) fn deliver(callback: &ProgressCallback, percent: u8) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(percent))).is_err() {
        tracing::warn!(percent, "progress listener panicked; continuing download");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_down() {
        assert_eq!(percent_of(0, 1000), 0);
        assert_eq!(percent_of(999, 1000), 99);
        assert_eq!(percent_of(1000, 1000), 100);
        assert_eq!(percent_of(2, 3), 66);
        assert_eq!(percent_of(5, 0), 100);
    }

    #[test]
    fn test_throttle_requires_gap_above_step() {
        let mut throttle = ProgressThrottle::new(5);
        assert_eq!(throttle.observe(0), Some(0));
        assert_eq!(throttle.observe(5), None);
        assert_eq!(throttle.observe(6), Some(6));
        assert_eq!(throttle.observe(8), None);
        assert_eq!(throttle.observe(100), Some(100));
        assert_eq!(throttle.observe(100), None);
    }

    #[test]
    fn test_throttle_respects_marked_value() {
        let mut throttle = ProgressThrottle::new(5);
        throttle.mark(0);
        assert_eq!(throttle.observe(3), None);
        assert_eq!(throttle.last(), Some(0));
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let callback: ProgressCallback = std::sync::Arc::new(|_| panic!("listener bug"));
        deliver(&callback, 42);
    }
}
