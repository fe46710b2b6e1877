//! # Sync request queue.
//!
//! Unbounded multi-producer / single-consumer FIFO between the append lock
//! (rollover, flush, close) and the sync worker.
//!
//! ## Rules
//! - Push never blocks and never fails while the worker is alive.
//! - Items are received in exactly the order they were pushed.
//! - `Shutdown` is pushed at most once, after every request that must precede it.
//! - Only the sync worker receives.

use tokio::sync::mpsc;

use crate::backend::{SyncMetadata, SyncRequest};

/// Item carried by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    Sync(SyncRequest),
    Shutdown,
}

/// Producer side of the queue.
#[derive(Debug, Clone)]
pub(crate) struct RequestQueue {
    tx: mpsc::UnboundedSender<Request>,
}

/// Consumer side of the queue.
pub(crate) type RequestReceiver = mpsc::UnboundedReceiver<Request>;

impl RequestQueue {
    pub(crate) fn new() -> (Self, RequestReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a sync request.
    pub(crate) fn add_sync_request(
        &self,
        base_name: &str,
        rollover_timestamp: u64,
        delete_file: bool,
        metadata: Option<SyncMetadata>,
    ) {
        self.push(Request::Sync(SyncRequest::new(
            base_name,
            rollover_timestamp,
            delete_file,
            metadata,
        )));
    }

    /// Queues the shutdown sentinel.
    pub(crate) fn add_shutdown_request(&self) {
        self.push(Request::Shutdown);
    }

    // Sending only fails once the worker is gone, i.e. after it consumed
    // `Shutdown`; nothing is pushed after that in the graceful path.
    fn push(&self, request: Request) {
        let _ = self.tx.send(request);
    }
}
