//! # Appender configuration.
//!
//! Provides [`AppenderConfig`] centralized settings for one appender instance.
//! The config is validated eagerly and frozen when the appender is built.
//!
//! ## Sentinel values
//! - `check_period = 0` → clamped to 1 ms
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::error::ConfigError;
use crate::freshness::FreshnessTimeouts;

/// Configuration for one appender.
///
/// ## Field semantics
/// - `base_name`: logical name of the rolled-over file family
/// - `close_on_shutdown`: graceful (`true`) vs abrupt (`false`) close, see below
/// - `check_period`: interval between freshness checks of the flush scheduler
/// - `bus_capacity`: event bus ring buffer size
/// - `timeouts`: per-level hard/soft flush timeouts
///
/// ## Close modes
/// - **graceful** (`close_on_shutdown = true`): `close()` closes the target,
///   queues a final deletable sync, then stops the sync worker after it
///   drained everything. Dropping the appender runs `close()`.
/// - **abrupt** (`close_on_shutdown = false`): `close()` only flushes and queues
///   a non-deleting sync; the sync worker and flush scheduler keep running so
///   logs keep reaching storage while the process tears down.
///
/// ```rust
/// use std::time::Duration;
/// use rollsync::{AppenderConfig, Level};
///
/// let mut cfg = AppenderConfig::new("app");
/// cfg.check_period = Duration::from_millis(250);
/// let rejected = cfg.set_flush_soft_timeouts_in_seconds("ERROR=2,FATAL=1");
/// assert!(rejected.is_empty());
/// assert_eq!(cfg.timeouts.soft(Level::Error), Duration::from_secs(2));
/// ```
#[derive(Clone, Debug)]
pub struct AppenderConfig {
    /// Base file name for log files.
    pub base_name: String,

    /// Whether `close()` finalizes the file and stops the sync worker.
    pub close_on_shutdown: bool,

    /// Period between checks of the freshness deadlines.
    ///
    /// Keep it well below the smallest timeout, otherwise flushes lag behind
    /// their deadlines by up to one period.
    pub check_period: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Per-level flush timeouts.
    pub timeouts: FreshnessTimeouts,
}

impl AppenderConfig {
    /// Default configuration with the given base name.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            ..Self::default()
        }
    }

    /// Applies `LEVEL=minutes` overrides to the hard timeouts.
    ///
    /// Invalid entries are logged, skipped and returned.
    pub fn set_flush_hard_timeouts_in_minutes(&mut self, csv: &str) -> Vec<ConfigError> {
        self.timeouts.set_hard_timeouts_in_minutes(csv)
    }

    /// Applies `LEVEL=seconds` overrides to the soft timeouts.
    ///
    /// Invalid entries are logged, skipped and returned.
    pub fn set_flush_soft_timeouts_in_seconds(&mut self, csv: &str) -> Vec<ConfigError> {
        self.timeouts.set_soft_timeouts_in_seconds(csv)
    }

    /// Returns the check period clamped to a minimum of 1 ms.
    #[inline]
    pub fn check_period_clamped(&self) -> Duration {
        self.check_period.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for AppenderConfig {
    /// Default configuration:
    ///
    /// - `base_name = ""`
    /// - `close_on_shutdown = true`
    /// - `check_period = 1s`
    /// - `bus_capacity = 1024`
    /// - `timeouts = FreshnessTimeouts::default()`
    fn default() -> Self {
        Self {
            base_name: String::new(),
            close_on_shutdown: true,
            check_period: Duration::from_millis(1000),
            bus_capacity: 1024,
            timeouts: FreshnessTimeouts::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::Level;

    #[test]
    fn test_defaults() {
        let cfg = AppenderConfig::default();
        assert!(cfg.close_on_shutdown);
        assert_eq!(cfg.check_period, Duration::from_secs(1));
        assert_eq!(cfg.base_name, "");
    }

    #[test]
    fn test_clamped_accessors() {
        let mut cfg = AppenderConfig::new("app");
        cfg.check_period = Duration::ZERO;
        cfg.bus_capacity = 0;
        assert_eq!(cfg.check_period_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_hard_overrides_keep_valid_entries() {
        let mut cfg = AppenderConfig::new("app");
        let rejected = cfg.set_flush_hard_timeouts_in_minutes("FOO=30,ERROR=5");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].as_label(), "config_unsupported_level");
        assert_eq!(cfg.timeouts.hard(Level::Error), Duration::from_secs(300));
    }
}
