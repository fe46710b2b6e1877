//! Runtime events: types and broadcast bus.
//!
//! The bus is the appender's error and diagnostic channel: hook failures on
//! the append, flush and sync paths are reported here instead of being
//! returned to the caller.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the coordinator (append/flush/close), the flush scheduler,
//!   the sync worker, the signal watcher.
//! - **Consumers**: the appender's subscriber listener (fans out to
//!   `SubscriberSet`, e.g. [`LogWriter`](crate::LogWriter)) and anything that
//!   called `Appender::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
