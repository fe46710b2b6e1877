//! # Write-side storage hooks.
//!
//! [`LogTarget`] is implemented once per storage backend. Every method runs
//! inside the coordinator's append lock, so implementations never see two
//! calls at once and should stay fast: producers wait on that lock.
//!
//! ## Failure semantics
//! | hook              | on `Err`                                               |
//! |-------------------|--------------------------------------------------------|
//! | `activate`        | appender becomes permanently closed                    |
//! | `write`           | this event is dropped, nothing else changes            |
//! | `should_rollover` | treated as a write failure (event already counted)     |
//! | `start_new_file`  | reported; the previous file was already queued for sync |
//! | `flush`           | reported; no sync request, deadlines kept              |
//! | `close`           | reported; the final sync is still queued               |

use crate::backend::{LogEvent, SyncMetadata};
use crate::error::BackendError;

/// Storage target that buffers, rolls over and flushes log events.
pub trait LogTarget: Send + 'static {
    /// One-time setup; `current_timestamp` is the first rollover timestamp
    /// (useful for naming the first file).
    fn activate(&mut self, current_timestamp: u64) -> Result<(), BackendError>;

    /// Appends (or buffers) one event.
    fn write(&mut self, event: &LogEvent) -> Result<(), BackendError>;

    /// Whether the current file must be rolled over after the last write.
    fn should_rollover(&self) -> Result<bool, BackendError>;

    /// Starts a new file; `last_event_timestamp` is the timestamp of the event
    /// that triggered the rollover.
    fn start_new_file(&mut self, last_event_timestamp: u64) -> Result<(), BackendError>;

    /// Flushes buffered data of the current file.
    fn flush(&mut self) -> Result<(), BackendError>;

    /// Finalizes the current file. The target is not reopened afterwards.
    fn close(&mut self) -> Result<(), BackendError>;

    /// Extra metadata captured when a sync request is created.
    fn sync_metadata(&self) -> Option<SyncMetadata> {
        None
    }
}
