//! # Storage capability interface.
//!
//! The appender core never touches storage itself. A concrete backend plugs in
//! through two traits, split by who calls them:
//!
//! ```text
//!                 ┌──────────── append lock ────────────┐
//! producers ──►   │ LogTarget: activate / write /        │
//! flush task ──►  │   should_rollover / start_new_file / │
//! close ──►       │   flush / close / sync_metadata      │
//!                 └──────────────────────────────────────┘
//!                           │ SyncRequest (FIFO)
//!                           ▼
//!                 SyncWorker ──► Syncer: sync / file_name
//! ```
//!
//! - [`LogTarget`] is owned by the coordinator and only used under its lock,
//!   so it takes `&mut self`.
//! - [`Syncer`] is shared with the background sync worker and may perform slow
//!   network I/O, so it is async and `&self`.
//!
//! A backend usually implements both on two cooperating values (e.g. a file
//! writer and an uploader sharing a directory).

mod clock;
mod record;
mod syncer;
mod target;

pub use clock::{Clock, ManualClock, SystemClock};
pub use record::LogEvent;
pub use syncer::{SyncMetadata, SyncRequest, Syncer};
pub use target::LogTarget;
