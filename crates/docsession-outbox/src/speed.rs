//! Editing speed of a session, measured as cursor invalidations per window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default measurement window.
pub const DEFAULT_SPEED_WINDOW: Duration = Duration::from_millis(5000);

/// Sliding-window counter of cursor invalidations.
#[derive(Debug)]
pub struct EditorSpeed {
    window: Duration,
    events: VecDeque<Instant>,
}

impl EditorSpeed {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            events: VecDeque::new(),
        }
    }

    /// Record an invalidation at `now`; returns the count inside the window.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.events.push_back(now);
        self.events.len()
    }

    /// Count of invalidations inside the window ending at `now`.
    pub fn current(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.events.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.events.front() {
            if now.saturating_duration_since(*front) > self.window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for EditorSpeed {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counts_within_window() {
        let mut speed = EditorSpeed::new(Duration::from_millis(100));
        let start = Instant::now();

        assert_eq!(speed.tick(start), 1);
        assert_eq!(speed.tick(start + Duration::from_millis(50)), 2);
        assert_eq!(speed.tick(start + Duration::from_millis(100)), 3);
    }

    #[test]
    fn test_old_events_expire() {
        let mut speed = EditorSpeed::new(Duration::from_millis(100));
        let start = Instant::now();

        speed.tick(start);
        speed.tick(start + Duration::from_millis(10));
        assert_eq!(speed.current(start + Duration::from_millis(105)), 1);
        assert_eq!(speed.current(start + Duration::from_millis(500)), 0);
        assert_eq!(speed.tick(start + Duration::from_millis(500)), 1);
    }
}
