//! # Per-level flush timeouts.
//!
//! [`FreshnessTimeouts`] maps every [`Level`] to a pair of durations:
//! - **hard timeout**: an event at `t` demands a flush no later than `t + hard`;
//! - **soft timeout**: an event at `t` asks for a flush at `t + soft` unless
//!   newer activity moves the soft deadline.
//!
//! ## Defaults
//! Tuned for high-latency remote storage (object stores, HDFS):
//! ```text
//! level   hard     soft
//! FATAL   5 min    5 s
//! ERROR   5 min    10 s
//! WARN    10 min   15 s
//! INFO    30 min   3 min
//! DEBUG   30 min   3 min
//! TRACE   30 min   3 min
//! ```
//!
//! ## Textual overrides
//! [`FreshnessTimeouts::set_hard_timeouts_in_minutes`] and
//! [`FreshnessTimeouts::set_soft_timeouts_in_seconds`] accept lists such as
//! `"INFO=30,WARN=10,ERROR=5"`. Every entry is validated on its own: a bad
//! entry is logged and returned as a [`ConfigError`], the good ones are applied.
//!
//! ```rust
//! use std::time::Duration;
//! use rollsync::{FreshnessTimeouts, Level};
//!
//! let mut timeouts = FreshnessTimeouts::default();
//! let rejected = timeouts.set_hard_timeouts_in_minutes("FOO=30,ERROR=5");
//!
//! assert_eq!(rejected.len(), 1);
//! assert_eq!(timeouts.hard(Level::Error), Duration::from_secs(5 * 60));
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::freshness::Level;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);

/// Which of the two per-level timeouts an override targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Hard,
    Soft,
}

impl TimeoutKind {
    fn unit(self) -> Duration {
        match self {
            TimeoutKind::Hard => MINUTE,
            TimeoutKind::Soft => SECOND,
        }
    }
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutKind::Hard => f.write_str("hard"),
            TimeoutKind::Soft => f.write_str("soft"),
        }
    }
}

/// Hard and soft flush timeout for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTimeouts {
    pub hard: Duration,
    pub soft: Duration,
}

/// Flush timeouts for every level, indexed by [`Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessTimeouts {
    per_level: [LevelTimeouts; 6],
}

impl Default for FreshnessTimeouts {
    fn default() -> Self {
        let entry = |hard_min: u64, soft_sec: u64| LevelTimeouts {
            hard: MINUTE * hard_min as u32,
            soft: SECOND * soft_sec as u32,
        };
        Self {
            // Trace, Debug, Info, Warn, Error, Fatal
            per_level: [
                entry(30, 180),
                entry(30, 180),
                entry(30, 180),
                entry(10, 15),
                entry(5, 10),
                entry(5, 5),
            ],
        }
    }
}

impl FreshnessTimeouts {
    /// Hard timeout for `level`.
    #[inline]
    pub fn hard(&self, level: Level) -> Duration {
        self.per_level[level.index()].hard
    }

    /// Soft timeout for `level`.
    #[inline]
    pub fn soft(&self, level: Level) -> Duration {
        self.per_level[level.index()].soft
    }

    /// Both timeouts for `level`.
    #[inline]
    pub fn get(&self, level: Level) -> LevelTimeouts {
        self.per_level[level.index()]
    }

    pub fn set_hard_timeout(&mut self, level: Level, timeout: Duration) {
        self.per_level[level.index()].hard = timeout;
    }

    pub fn set_soft_timeout(&mut self, level: Level, timeout: Duration) {
        self.per_level[level.index()].soft = timeout;
    }

    /// Applies `LEVEL=minutes` overrides to the hard timeouts.
    ///
    /// Returns the entries that were rejected (each one is also logged).
    pub fn set_hard_timeouts_in_minutes(&mut self, csv: &str) -> Vec<ConfigError> {
        self.apply_overrides(csv, TimeoutKind::Hard)
    }

    /// Applies `LEVEL=seconds` overrides to the soft timeouts.
    ///
    /// Returns the entries that were rejected (each one is also logged).
    pub fn set_soft_timeouts_in_seconds(&mut self, csv: &str) -> Vec<ConfigError> {
        self.apply_overrides(csv, TimeoutKind::Soft)
    }

    fn apply_overrides(&mut self, csv: &str, kind: TimeoutKind) -> Vec<ConfigError> {
        let mut rejected = Vec::new();

        for token in csv.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_entry(token, kind) {
                Ok((level, timeout)) => match kind {
                    TimeoutKind::Hard => self.set_hard_timeout(level, timeout),
                    TimeoutKind::Soft => self.set_soft_timeout(level, timeout),
                },
                Err(err) => {
                    tracing::error!(label = err.as_label(), entry = token, "{err}");
                    rejected.push(err);
                }
            }
        }
        rejected
    }
}

/// Parses one `LEVEL=value` entry; the level is validated before the value.
fn parse_entry(token: &str, kind: TimeoutKind) -> Result<(Level, Duration), ConfigError> {
    let (name, value) = match token.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (token, None),
    };

    let level: Level = name.parse().map_err(|_| ConfigError::UnsupportedLevel {
        kind,
        level: name.to_string(),
    })?;

    let invalid = || ConfigError::InvalidValue {
        kind,
        level,
        value: value.unwrap_or_default().to_string(),
    };

    let units: u32 = value.ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let timeout = kind.unit().checked_mul(units).ok_or_else(invalid)?;
    Ok((level, timeout))
}
