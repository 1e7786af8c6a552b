// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One-shot notification timer.

use std::time::{Duration, Instant};

/// Default delay before a volume change is announced.
pub const VOLUME_NOTIFY_DELAY: Duration = Duration::from_millis(30);

/// A one-shot timer that can be armed at most once at a time.
///
/// Re-arming while armed keeps the original deadline, so a burst of changes
/// produces one notification.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arm the timer. Returns false if it was already armed.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.delay);
        true
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and return true if the deadline has passed.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new(VOLUME_NOTIFY_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearm_keeps_first_deadline() {
        let start = Instant::now();
        let mut debounce = Debounce::default();

        assert!(debounce.arm(start));
        assert!(!debounce.arm(start + Duration::from_millis(20)));
        assert_eq!(debounce.deadline(), Some(start + VOLUME_NOTIFY_DELAY));
    }

    #[test]
    fn test_fires_once() {
        let start = Instant::now();
        let mut debounce = Debounce::default();
        debounce.arm(start);

        assert!(!debounce.fire_due(start + Duration::from_millis(29)));
        assert!(debounce.fire_due(start + Duration::from_millis(30)));
        assert!(!debounce.fire_due(start + Duration::from_millis(60)));
        assert!(!debounce.is_armed());
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debounce = Debounce::default();
        debounce.arm(start);
        debounce.cancel();
        assert!(!debounce.fire_due(start + Duration::from_secs(1)));
    }
}
