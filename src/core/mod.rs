//! Runtime core: coordination, background tasks and lifecycle.
//!
//! The public API from this module is [`Appender`] (built with
//! [`AppenderBuilder`] from an [`AppenderConfig`]) and its [`Lifecycle`].
//!
//! Internal modules:
//! - [`coordinator`]: the append lock: write, rollover, freshness flush, close;
//! - [`queue`]: FIFO of sync requests between the lock holders and the worker;
//! - [`sync_worker`]: drains the queue through the backend's [`Syncer`](crate::Syncer);
//! - [`flusher`]: periodic freshness check;
//! - [`shutdown`]: cross-platform termination signal handling.

mod appender;
mod builder;
mod config;
mod coordinator;
mod flusher;
mod queue;
mod shutdown;
mod sync_worker;

pub use appender::Appender;
pub use builder::AppenderBuilder;
pub use config::AppenderConfig;
pub use coordinator::Lifecycle;
