//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   coordinator / flush task / sync worker ── publish(Event) ──► Bus
//!                                                                 │
//!                                              subscriber listener (Appender)
//!                                                                 │
//!                                                     SubscriberSet::emit(&Event)
//!                                                   ┌─────────────┼─────────────┐
//!                                                   ▼             ▼             ▼
//!                                               LogWriter      Metrics       Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use rollsync::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct SyncAlerts;
//!
//! #[async_trait]
//! impl Subscribe for SyncAlerts {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::SyncFailed {
//!             // page someone: a file will never reach remote storage
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "sync-alerts" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
