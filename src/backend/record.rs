//! # Log event handed to the storage hooks.

use std::sync::Arc;

use crate::freshness::Level;

/// One log event.
///
/// `timestamp` is the event time in milliseconds since the UNIX epoch; it
/// drives both the freshness deadlines and the rollover naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: Level,
    pub timestamp: u64,
    pub message: Arc<str>,
}

impl LogEvent {
    pub fn new(level: Level, timestamp: u64, message: impl Into<Arc<str>>) -> Self {
        Self {
            level,
            timestamp,
            message: message.into(),
        }
    }
}
