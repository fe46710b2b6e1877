//! # rollsync
//!
//! **rollsync** schedules flushes and background synchronization for buffered,
//! rolling log appenders.
//!
//! A storage backend (local files, an object store, HDFS) plugs in through two
//! traits; the crate decides *when* buffered data must be flushed and *which*
//! file must be synchronized, and runs the synchronization off the producer
//! path.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer threads                flush scheduler (every check_period)
//!          │ append(event)                       │ flush_if_expired(now)
//!          ▼                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (append lock)                                        │
//! │  - LogTarget: write / should_rollover / start_new_file / flush    │
//! │  - FreshnessTracker: hard + soft deadlines                        │
//! │  - events_logged, last_rollover_ts                                │
//! └───────────────┬───────────────────────────────────┬───────────────┘
//!                 │ Sync(base, ts, delete) / Shutdown  │ publish(Event)
//!                 ▼                                    ▼
//!        ┌──────────────────┐              ┌──────────────────────┐
//!        │  request queue   │              │  Bus (broadcast)     │
//!        │  (FIFO, unbound) │              └──────────┬───────────┘
//!        └────────┬─────────┘                         ▼
//!                 ▼                          event listener ─► SubscriberSet
//!        ┌──────────────────┐                          ┌──────┴──────┐
//!        │   SyncWorker     │── publish(Event) ──►     ▼             ▼
//!        │ Syncer::sync()   │                      LogWriter      custom
//!        └──────────────────┘
//! ```
//!
//! ### Freshness
//! ```text
//! on_event(level, t):  hard = min(hard, t + hard(level))
//!                      min_soft = min(min_soft, soft(level))
//!                      soft = t + min_soft
//! expired(now):        now >= soft || now >= hard
//! flush / rollover:    deadlines = +inf, min_soft = soft(TRACE)
//!                      (soft(FATAL) while the shutdown signal is raised)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Backend API**   | Plug in storage: write/roll/flush and remote sync.           | [`LogTarget`], [`Syncer`]                 |
//! | **Freshness**     | Per-level hard/soft flush timeouts and the deadline engine.  | [`FreshnessTimeouts`], [`FreshnessTracker`] |
//! | **Runtime**       | Activation, append, background flush/sync, close.            | [`Appender`], [`AppenderBuilder`]         |
//! | **Subscriber API**| Hook into flush/sync/failure events.                         | [`Subscribe`], [`Event`]                  |
//! | **Errors**        | Typed errors for configuration, lifecycle and hooks.         | [`AppenderError`], [`BackendError`]       |
//! | **Configuration** | Centralize appender settings.                                | [`AppenderConfig`]                        |
//!
//! ## Optional features
//! - `logging` (default): [`LogWriter`] renders events through `tracing` and is
//!   installed by [`AppenderBuilder`] unless subscribers are replaced.
//!
//! ## Example
//! See [`Appender`] for a complete in-memory backend, and
//! `demos/local_files.rs` for a local-directory backend.

mod backend;
mod core;
mod error;
mod events;
mod freshness;
mod subscribers;

#[cfg(test)]
mod test_utils;

// ---- Public re-exports ----

pub use backend::{
    Clock, LogEvent, LogTarget, ManualClock, SyncMetadata, SyncRequest, Syncer, SystemClock,
};
pub use crate::core::{Appender, AppenderBuilder, AppenderConfig, Lifecycle};
pub use error::{AppenderError, BackendError, ConfigError, ParseLevelError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use freshness::{FreshnessTimeouts, FreshnessTracker, Level, LevelTimeouts, TimeoutKind};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in tracing subscriber.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
