//! Freshness model: how stale unflushed log data may become.
//!
//! ## Contents
//! - [`Level`] severity levels (ordered least → most severe)
//! - [`FreshnessTimeouts`] per-level hard/soft timeouts, with textual overrides
//! - [`FreshnessTracker`] soft/hard deadline state for the current epoch
//!
//! ## Quick wiring
//! ```text
//! AppenderConfig { timeouts: FreshnessTimeouts }
//!      └─► core::coordinator owns one FreshnessTracker:
//!           - on_event() after every successful write
//!           - is_expired() from the flush scheduler
//!           - reset() after every flush or rollover
//! ```

mod level;
mod timeouts;
mod tracker;

pub use level::Level;
pub use timeouts::{FreshnessTimeouts, LevelTimeouts, TimeoutKind};
pub use tracker::FreshnessTracker;
