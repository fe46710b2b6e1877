//! # Logging subscriber backed by `tracing`.
//!
//! [`LogWriter`] renders every runtime event as a structured `tracing` record
//! under the `rollsync` target. Failures are logged at `ERROR`, shutdown-path
//! notices at `INFO`, routine flush/sync traffic at `DEBUG`.
//!
//! ## Output (fmt subscriber)
//! ```text
//! ERROR rollsync: failed to sync log file file="app.1700000000000.log" delete_file=true reason="connection reset"
//! DEBUG rollsync: flushed log file base_name="app" rollover_ts=1700000000000
//! INFO  rollsync: appender closed base_name="app"
//! ```
//!
//! Installed by default by [`AppenderBuilder`](crate::AppenderBuilder) when the
//! `logging` feature is enabled.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Structured logging subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let base_name = e.base_name.as_deref().unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or_default();
        let file = e.file.as_deref().unwrap_or_default();

        match e.kind {
            EventKind::Activated => {
                tracing::info!(target: "rollsync", base_name, rollover_ts = e.rollover_ts, "appender activated");
            }
            EventKind::ActivationFailed => {
                tracing::error!(target: "rollsync", base_name, reason, "failed to activate appender");
            }
            EventKind::ActivationRejected => {
                tracing::warn!(target: "rollsync", base_name, reason, "activation rejected");
            }
            EventKind::CloseFailed => {
                tracing::error!(target: "rollsync", base_name, reason, "close hook failed");
            }
            EventKind::Closed => {
                tracing::info!(target: "rollsync", base_name, delete_file = e.delete_file, "appender closed");
            }
            EventKind::ShutdownSignaled => {
                tracing::info!(target: "rollsync", "shutdown signaled");
            }
            EventKind::WriteFailed => {
                tracing::error!(target: "rollsync", base_name, reason, "failed to write log event");
            }
            EventKind::RolledOver => {
                tracing::debug!(target: "rollsync", base_name, rollover_ts = e.rollover_ts, "started new log file");
            }
            EventKind::RolloverFailed => {
                tracing::error!(target: "rollsync", base_name, rollover_ts = e.rollover_ts, reason, "failed to start new log file");
            }
            EventKind::Flushed => {
                tracing::debug!(target: "rollsync", base_name, rollover_ts = e.rollover_ts, "flushed log file");
            }
            EventKind::FlushFailed => {
                tracing::error!(target: "rollsync", base_name, reason, "failed to flush log file");
            }
            EventKind::SyncCompleted => {
                tracing::debug!(target: "rollsync", file, delete_file = e.delete_file, "synced log file");
            }
            EventKind::SyncFailed => {
                tracing::error!(target: "rollsync", file, delete_file = e.delete_file, reason, "failed to sync log file");
            }
            EventKind::SyncPanicked => {
                tracing::error!(target: "rollsync", file, delete_file = e.delete_file, reason, "sync hook panicked");
            }
            EventKind::FlushSchedulerStopped => {
                tracing::debug!(target: "rollsync", base_name, "flush scheduler stopped");
            }
            EventKind::SyncWorkerStopped => {
                tracing::debug!(target: "rollsync", base_name, "sync worker stopped");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
