//! # Sync-side storage hooks and the sync request payload.
//!
//! A [`SyncRequest`] names a file by `(base_name, rollover_timestamp)`; the
//! file may be the current one (periodic flush, `delete_file = false`) or one
//! that was already rolled over (`delete_file = true`).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use rollsync::{BackendError, SyncRequest, Syncer};
//!
//! struct Uploader;
//!
//! #[async_trait]
//! impl Syncer for Uploader {
//!     async fn sync(&self, request: &SyncRequest) -> Result<(), BackendError> {
//!         let _name = self.file_name(request.base_name(), request.rollover_timestamp());
//!         // upload, then remove the local copy if request.delete_file()
//!         Ok(())
//!     }
//!
//!     fn file_name(&self, base_name: &str, rollover_timestamp: u64) -> String {
//!         format!("{base_name}.{rollover_timestamp}.log")
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendError;

/// Extra per-file metadata attached to a sync request.
pub type SyncMetadata = HashMap<String, String>;

/// Request to synchronize one log file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    base_name: Arc<str>,
    rollover_timestamp: u64,
    delete_file: bool,
    metadata: Option<SyncMetadata>,
}

impl SyncRequest {
    pub fn new(
        base_name: impl Into<Arc<str>>,
        rollover_timestamp: u64,
        delete_file: bool,
        metadata: Option<SyncMetadata>,
    ) -> Self {
        Self {
            base_name: base_name.into(),
            rollover_timestamp,
            delete_file,
            metadata,
        }
    }

    /// Base name of the file family.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Approximate time the file was rolled over (or created, for the first file).
    pub fn rollover_timestamp(&self) -> u64 {
        self.rollover_timestamp
    }

    /// Whether the local file may be deleted once synced.
    pub fn delete_file(&self) -> bool {
        self.delete_file
    }

    /// Metadata captured when the request was created.
    pub fn metadata(&self) -> Option<&SyncMetadata> {
        self.metadata.as_ref()
    }
}

/// Durable/remote synchronization of log files.
///
/// Called sequentially (FIFO) from one background worker. A failed or
/// panicking `sync` is reported and **not** retried.
#[async_trait]
pub trait Syncer: Send + Sync + 'static {
    /// Synchronizes the file described by `request`.
    async fn sync(&self, request: &SyncRequest) -> Result<(), BackendError>;

    /// Deterministic file name for `(base_name, rollover_timestamp)`, used in diagnostics.
    fn file_name(&self, base_name: &str, rollover_timestamp: u64) -> String;
}
