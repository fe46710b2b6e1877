//! # Sync worker: drains the request queue one request at a time.
//!
//! ```text
//! loop:
//!   recv() ─┬─ Sync(req) → syncer.sync(&req)
//!           │                 ├─ Ok     → SyncCompleted
//!           │                 ├─ Err    → SyncFailed  (file name, delete flag, reason)
//!           │                 └─ panic  → SyncPanicked
//!           ├─ Shutdown   → SyncWorkerStopped, exit
//!           └─ closed     → SyncWorkerStopped, exit
//! ```
//!
//! ## Rules
//! - Strict FIFO: a request is never started before the previous one finished.
//! - A failed request is reported and **not** retried; the loop moves on.
//! - Nothing queued behind `Shutdown` is processed.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::backend::{SyncRequest, Syncer};
use crate::core::queue::{Request, RequestReceiver};
use crate::events::{Bus, Event, EventKind};

/// Single consumer of the request queue.
pub(crate) struct SyncWorker {
    syncer: Arc<dyn Syncer>,
    rx: RequestReceiver,
    bus: Bus,
    base_name: Arc<str>,
}

impl SyncWorker {
    pub(crate) fn new(
        syncer: Arc<dyn Syncer>,
        rx: RequestReceiver,
        bus: Bus,
        base_name: Arc<str>,
    ) -> Self {
        Self {
            syncer,
            rx,
            bus,
            base_name,
        }
    }

    /// Runs until the shutdown request is taken or every producer is gone.
    pub(crate) async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            match request {
                Request::Sync(req) => self.process(&req).await,
                Request::Shutdown => break,
            }
        }
        self.bus.publish(
            Event::new(EventKind::SyncWorkerStopped).with_base_name(Arc::clone(&self.base_name)),
        );
    }

    async fn process(&self, req: &SyncRequest) {
        let outcome = AssertUnwindSafe(self.syncer.sync(req)).catch_unwind().await;
        let event = match outcome {
            Ok(Ok(())) => Event::new(EventKind::SyncCompleted),
            Ok(Err(e)) => Event::new(EventKind::SyncFailed).with_reason(e.to_string()),
            Err(panic) => Event::new(EventKind::SyncPanicked).with_reason(panic_message(&*panic)),
        };
        let file = self.syncer.file_name(req.base_name(), req.rollover_timestamp());
        self.bus.publish(event.with_request(req).with_file(file));
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
