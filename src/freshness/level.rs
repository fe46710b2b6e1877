//! # Severity levels.
//!
//! [`Level`] is totally ordered from least to most severe:
//! `Trace < Debug < Info < Warn < Error < Fatal`.
//!
//! The freshness engine only uses levels as a lookup key and to pick the
//! least/most severe entry of a timeout table, so the set is fixed.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseLevelError;

/// Log event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// All levels, least severe first.
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// The least severe level.
    pub const LEAST_SEVERE: Level = Level::Trace;

    /// The most severe level.
    pub const MOST_SEVERE: Level = Level::Fatal;

    /// Returns the canonical uppercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring ASCII case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseLevelError {
                name: name.to_string(),
            })
    }
}
