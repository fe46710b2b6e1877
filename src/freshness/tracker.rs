//! # Freshness tracker: soft/hard flush deadlines.
//!
//! [`FreshnessTracker`] decides *when* buffered log data is too stale to stay
//! unflushed. It is a plain data structure; the coordinator owns it and only
//! touches it under the append lock.
//!
//! ## Update rules
//! ```text
//! on_event(level, t):
//!   hard_deadline    = min(hard_deadline, t + hard(level))     only tightens
//!   min_soft_timeout = min(min_soft_timeout, soft(level))      only shrinks
//!   soft_deadline    = t + min_soft_timeout                    may move either way
//!
//! is_expired(now) = now >= soft_deadline || now >= hard_deadline
//!
//! reset(shutting_down):
//!   hard_deadline = soft_deadline = +inf
//!   min_soft_timeout = soft(MOST_SEVERE)   if shutting_down
//!                      soft(LEAST_SEVERE)  otherwise
//! ```
//!
//! The soft deadline is recomputed from the newest event, not accumulated as a
//! running minimum: a burst of activity pushes it out, but never with a timeout
//! looser than the tightest one seen since the last reset.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use rollsync::{FreshnessTimeouts, FreshnessTracker, Level};
//!
//! let mut timeouts = FreshnessTimeouts::default();
//! timeouts.set_hard_timeout(Level::Fatal, Duration::from_millis(1000));
//! timeouts.set_soft_timeout(Level::Fatal, Duration::from_millis(100));
//!
//! let mut tracker = FreshnessTracker::new(timeouts);
//! tracker.on_event(Level::Fatal, 0);
//! tracker.on_event(Level::Fatal, 50);
//! assert_eq!(tracker.hard_deadline(), Some(1000));
//! assert_eq!(tracker.soft_deadline(), Some(150));
//! assert!(tracker.is_expired(150));
//! ```

use std::time::Duration;

use crate::freshness::{FreshnessTimeouts, Level};

/// Deadline meaning "never".
const NEVER: u64 = u64::MAX;

#[inline]
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(NEVER)
}

/// Soft/hard flush deadlines for the current epoch.
///
/// Timestamps are milliseconds since the UNIX epoch. A deadline of `None`
/// (as returned by the accessors) means +infinity.
#[derive(Debug, Clone)]
pub struct FreshnessTracker {
    timeouts: FreshnessTimeouts,
    hard_deadline: u64,
    soft_deadline: u64,
    min_soft_timeout: u64,
}

impl FreshnessTracker {
    /// Creates a tracker in the freshly reset (not shutting down) state.
    pub fn new(timeouts: FreshnessTimeouts) -> Self {
        let mut tracker = Self {
            timeouts,
            hard_deadline: NEVER,
            soft_deadline: NEVER,
            min_soft_timeout: NEVER,
        };
        tracker.reset(false);
        tracker
    }

    /// Starts a new epoch.
    ///
    /// While shutting down the soft ceiling is lowered to the most severe
    /// level's soft timeout, so the next flush happens as early as possible.
    pub fn reset(&mut self, shutting_down: bool) {
        self.hard_deadline = NEVER;
        self.soft_deadline = NEVER;
        let ceiling = if shutting_down {
            Level::MOST_SEVERE
        } else {
            Level::LEAST_SEVERE
        };
        self.min_soft_timeout = millis(self.timeouts.soft(ceiling));
    }

    /// Accounts for one event of `level` logged at `timestamp`.
    pub fn on_event(&mut self, level: Level, timestamp: u64) {
        let hard = timestamp.saturating_add(millis(self.timeouts.hard(level)));
        self.hard_deadline = self.hard_deadline.min(hard);

        self.min_soft_timeout = self.min_soft_timeout.min(millis(self.timeouts.soft(level)));
        self.soft_deadline = timestamp.saturating_add(self.min_soft_timeout);
    }

    /// True once either deadline has been reached.
    #[inline]
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.soft_deadline || now >= self.hard_deadline
    }

    /// Hard deadline, `None` for +infinity.
    pub fn hard_deadline(&self) -> Option<u64> {
        (self.hard_deadline != NEVER).then_some(self.hard_deadline)
    }

    /// Soft deadline, `None` for +infinity.
    pub fn soft_deadline(&self) -> Option<u64> {
        (self.soft_deadline != NEVER).then_some(self.soft_deadline)
    }

    /// Tightest soft timeout seen in this epoch (or the reset ceiling).
    pub fn min_soft_timeout(&self) -> Duration {
        Duration::from_millis(self.min_soft_timeout)
    }

    pub fn timeouts(&self) -> &FreshnessTimeouts {
        &self.timeouts
    }
}
