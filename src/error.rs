//! Error types used by the appender runtime, its configuration and its hooks.
//!
//! - [`ConfigError`] — a rejected timeout override (the rest still apply).
//! - [`AppenderError`] — lifecycle misuse or activation failure.
//! - [`BackendError`] — a storage hook failed.
//! - [`RuntimeError`] — background tasks did not stop in time.
//!
//! Each enum provides `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::freshness::{Level, TimeoutKind};

/// Unknown level name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported level '{name}'")]
pub struct ParseLevelError {
    /// The name that failed to parse (trimmed).
    pub name: String,
}

/// # A rejected per-level timeout override.
///
/// Produced by [`FreshnessTimeouts`](crate::FreshnessTimeouts) parsers; the
/// offending entry is skipped, the rest of the list is still applied.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The level name is not one of the supported levels.
    #[error("failed to set {kind} flush timeout for unsupported level '{level}'")]
    UnsupportedLevel { kind: TimeoutKind, level: String },

    /// The value is missing, not a non-negative integer, or overflows.
    #[error("failed to set {kind} flush timeout for level {level}: invalid value '{value}'")]
    InvalidValue {
        kind: TimeoutKind,
        level: Level,
        value: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::UnsupportedLevel { .. } => "config_unsupported_level",
            ConfigError::InvalidValue { .. } => "config_invalid_value",
        }
    }
}

/// # Errors returned by the appender's lifecycle API.
///
/// Hook failures during `append`/flush/sync are **not** returned here; they
/// are published on the event bus and the appender keeps running.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppenderError {
    /// `activate` was called on an already active appender.
    #[error("appender already activated")]
    AlreadyActive,

    /// The appender is closed (explicitly, or after a failed activation).
    #[error("appender is closed")]
    Closed,

    /// The operation needs an active appender but `activate` was never called.
    #[error("appender not activated")]
    NotActive,

    /// Activation failed; the appender is now permanently closed.
    #[error("failed to activate appender: {error}")]
    Activation { error: String },
}

impl AppenderError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppenderError::AlreadyActive => "appender_already_active",
            AppenderError::Closed => "appender_closed",
            AppenderError::NotActive => "appender_not_active",
            AppenderError::Activation { .. } => "appender_activation_failed",
        }
    }
}

/// # Errors raised by storage hooks.
///
/// Returned by [`LogTarget`](crate::LogTarget) and [`Syncer`](crate::Syncer)
/// implementations. None of them is retried.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BackendError {
    /// Underlying I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other hook failure.
    #[error("{error}")]
    Fail { error: String },
}

impl BackendError {
    /// Convenience constructor for [`BackendError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        BackendError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::Io(_) => "backend_io",
            BackendError::Fail { .. } => "backend_failed",
        }
    }
}

/// # Errors produced while stopping the background tasks.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some background tasks were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Background tasks that had not finished.
        stuck: Vec<&'static str>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rollsync::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
