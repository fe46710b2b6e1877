//! # Runtime events emitted by the appender and its background tasks.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: activation and close
//! - **Write path events**: write failures and rollovers
//! - **Flush/sync events**: periodic flushes and sync results
//! - **Task events**: background tasks stopping
//!
//! The [`Event`] struct carries optional metadata: the file identity
//! (`base_name`, `rollover_ts`, `file`), `delete_file` and a `reason`.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use rollsync::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SyncFailed)
//!     .with_file("app.1700000000000.log")
//!     .with_reason("connection reset");
//!
//! assert_eq!(ev.kind, EventKind::SyncFailed);
//! assert_eq!(ev.file.as_deref(), Some("app.1700000000000.log"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::backend::SyncRequest;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle ===
    /// Appender activated; background tasks are running.
    ///
    /// Sets: `base_name`, `rollover_ts` (first file)
    Activated,

    /// Activation failed; the appender is permanently closed.
    ///
    /// Sets: `base_name`, `reason`
    ActivationFailed,

    /// `activate` called on an appender that is already active or closed.
    ///
    /// Sets: `base_name`, `reason`
    ActivationRejected,

    /// The close hook failed (close still completes).
    ///
    /// Sets: `base_name`, `reason`
    CloseFailed,

    /// Appender closed.
    ///
    /// Sets: `base_name`, `rollover_ts`, `delete_file` (final sync request)
    Closed,

    /// Shutdown signal raised (OS signal or explicit call).
    ShutdownSignaled,

    // === Write path ===
    /// The write hook (or the rollover query) failed; the event was dropped.
    ///
    /// Sets: `base_name`, `reason`
    WriteFailed,

    /// A new file was started.
    ///
    /// Sets: `base_name`, `rollover_ts` (new file)
    RolledOver,

    /// Starting the new file failed after the old one was queued for sync.
    ///
    /// Sets: `base_name`, `rollover_ts`, `reason`
    RolloverFailed,

    // === Flush / sync ===
    /// A freshness deadline expired; the current file was flushed and queued.
    ///
    /// Sets: `base_name`, `rollover_ts`
    Flushed,

    /// The flush hook failed.
    ///
    /// Sets: `base_name`, `reason`
    FlushFailed,

    /// A sync request completed.
    ///
    /// Sets: `base_name`, `rollover_ts`, `delete_file`, `file`
    SyncCompleted,

    /// A sync request failed; it is not retried.
    ///
    /// Sets: `base_name`, `rollover_ts`, `delete_file`, `file`, `reason`
    SyncFailed,

    /// The sync hook panicked; the worker carries on with the next request.
    ///
    /// Sets: `base_name`, `rollover_ts`, `delete_file`, `file`, `reason`
    SyncPanicked,

    // === Background tasks ===
    /// The flush scheduler left its loop.
    FlushSchedulerStopped,

    /// The sync worker processed the shutdown request (or lost its queue).
    SyncWorkerStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Base name of the file family.
    pub base_name: Option<Arc<str>>,
    /// Rollover timestamp identifying the file.
    pub rollover_ts: Option<u64>,
    /// Computed file name (sync events only).
    pub file: Option<Arc<str>>,
    /// Whether the file was eligible for deletion after sync.
    pub delete_file: Option<bool>,
    /// Human-readable reason (error details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            base_name: None,
            rollover_ts: None,
            file: None,
            delete_file: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_base_name(mut self, base_name: impl Into<Arc<str>>) -> Self {
        self.base_name = Some(base_name.into());
        self
    }

    #[inline]
    pub fn with_rollover_ts(mut self, ts: u64) -> Self {
        self.rollover_ts = Some(ts);
        self
    }

    #[inline]
    pub fn with_file(mut self, file: impl Into<Arc<str>>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[inline]
    pub fn with_delete_file(mut self, delete_file: bool) -> Self {
        self.delete_file = Some(delete_file);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the identity of the file a sync request refers to.
    pub fn with_request(self, request: &SyncRequest) -> Self {
        self.with_base_name(request.base_name())
            .with_rollover_ts(request.rollover_timestamp())
            .with_delete_file(request.delete_file())
    }

    /// True for events that report a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ActivationFailed
                | EventKind::CloseFailed
                | EventKind::WriteFailed
                | EventKind::RolloverFailed
                | EventKind::FlushFailed
                | EventKind::SyncFailed
                | EventKind::SyncPanicked
        )
    }
}
