//! # Appender: public facade over the coordinator and its background tasks.
//!
//! ```text
//! AppenderBuilder::build() ──► Appender (Uninitialized)
//!
//! activate()
//!   ├─► event listener: Bus ─► SubscriberSet (if any subscribers)
//!   └─► coordinator.activate(start):
//!         reset tracker, last_rollover_ts = now, target.activate(now)
//!         start: spawn SyncWorker(queue rx) + FlushScheduler(check_period)
//!
//! append(event) ──► coordinator.append (append lock)
//!
//! close() / Drop (graceful only) ──► coordinator.close()
//!   graceful: final Sync(delete) + Shutdown queued, signal raised
//!             → FlushScheduler exits, SyncWorker drains and exits
//!   abrupt:   flush + Sync(no delete) queued, tasks keep running
//!
//! shutdown(grace) ──► close(), then join the tasks within `grace`
//! ```
//!
//! ## Rules
//! - `activate` needs a tokio runtime; without one the appender closes for good.
//! - Producers never wait on storage I/O performed by the sync worker.
//! - In graceful mode dropping the last handle finalizes the current file.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use rollsync::{
//!     AppenderBuilder, AppenderConfig, BackendError, Level, LogEvent, LogTarget,
//!     SyncRequest, Syncer,
//! };
//!
//! struct Memory(Vec<String>);
//!
//! impl LogTarget for Memory {
//!     fn activate(&mut self, _ts: u64) -> Result<(), BackendError> { Ok(()) }
//!     fn write(&mut self, e: &LogEvent) -> Result<(), BackendError> {
//!         self.0.push(e.message.to_string());
//!         Ok(())
//!     }
//!     fn should_rollover(&self) -> Result<bool, BackendError> { Ok(self.0.len() >= 1000) }
//!     fn start_new_file(&mut self, _ts: u64) -> Result<(), BackendError> {
//!         self.0.clear();
//!         Ok(())
//!     }
//!     fn flush(&mut self) -> Result<(), BackendError> { Ok(()) }
//!     fn close(&mut self) -> Result<(), BackendError> { Ok(()) }
//! }
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl Syncer for Discard {
//!     async fn sync(&self, _req: &SyncRequest) -> Result<(), BackendError> { Ok(()) }
//!     fn file_name(&self, base: &str, ts: u64) -> String { format!("{base}.{ts}") }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let appender = AppenderBuilder::new(AppenderConfig::new("app"), Memory(Vec::new()), Discard)
//!         .build();
//!     appender.activate()?;
//!     appender.append(&LogEvent::new(Level::Info, 1_700_000_000_000, "hello"))?;
//!     appender.shutdown(Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{LogEvent, Syncer},
    core::{
        coordinator::{Coordinator, Lifecycle},
        flusher::FlushScheduler,
        queue::RequestReceiver,
        shutdown,
        sync_worker::SyncWorker,
    },
    error::{AppenderError, RuntimeError},
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

const SYNC_WORKER: &str = "sync-worker";
const FLUSH_SCHEDULER: &str = "flush-scheduler";
const EVENT_LISTENER: &str = "event-listener";

type Task = (&'static str, JoinHandle<()>);

/// A running (or not yet activated) appender instance.
///
/// Obtained from [`AppenderBuilder`](crate::AppenderBuilder); always handled
/// through an `Arc`, so producers on any thread can share it.
pub struct Appender {
    coordinator: Arc<Coordinator>,
    syncer: Arc<dyn Syncer>,
    bus: Bus,
    shutdown: CancellationToken,
    listener_stop: CancellationToken,
    check_period: Duration,

    receiver: Mutex<Option<RequestReceiver>>,
    subscribers: Mutex<Option<Vec<Arc<dyn Subscribe>>>>,
    tasks: Mutex<Vec<Task>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Appender {
    pub(crate) fn new_internal(
        coordinator: Arc<Coordinator>,
        syncer: Arc<dyn Syncer>,
        bus: Bus,
        shutdown: CancellationToken,
        check_period: Duration,
        receiver: RequestReceiver,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        Self {
            coordinator,
            syncer,
            bus,
            shutdown,
            listener_stop: CancellationToken::new(),
            check_period,
            receiver: Mutex::new(Some(receiver)),
            subscribers: Mutex::new(Some(subscribers)),
            tasks: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
        }
    }

    /// Activates the backend and starts the background tasks.
    ///
    /// Fails with [`AppenderError::AlreadyActive`] / [`AppenderError::Closed`]
    /// without side effects when called in the wrong state. Any other failure
    /// (activate hook, no tokio runtime) closes the appender permanently.
    pub fn activate(&self) -> Result<(), AppenderError> {
        let runtime = Handle::try_current();
        if let Ok(rt) = &runtime {
            self.start_listener(rt);
        }

        let tasks = self.coordinator.activate(|| {
            let rt = runtime
                .as_ref()
                .map_err(|e| format!("no tokio runtime: {e}"))?;
            let receiver = lock(&self.receiver)
                .take()
                .ok_or_else(|| "request queue already consumed".to_string())?;
            Ok(self.spawn_tasks(rt, receiver))
        })?;

        lock(&self.tasks).extend(tasks);
        Ok(())
    }

    /// Appends one event.
    ///
    /// Only lifecycle misuse is returned; storage failures are reported on the
    /// event bus and the event is dropped.
    pub fn append(&self, event: &LogEvent) -> Result<(), AppenderError> {
        self.coordinator.append(event)
    }

    /// Closes the appender. Idempotent: returns `true` only for the call that
    /// performed the close.
    pub fn close(&self) -> bool {
        self.coordinator.close()
    }

    /// Closes the appender and waits up to `grace` for the background tasks.
    ///
    /// In abrupt mode (`close_on_shutdown = false`) the tasks are meant to keep
    /// running, so this returns right after `close()`.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), RuntimeError> {
        self.close();
        if !self.coordinator.is_graceful() {
            return Ok(());
        }

        let mut tasks = std::mem::take(&mut *lock(&self.tasks));
        let mut listener = lock(&self.listener).take();
        let stop = self.listener_stop.clone();

        let done = async {
            for (_, handle) in tasks.iter_mut() {
                let _ = handle.await;
            }
            stop.cancel();
            if let Some(handle) = listener.as_mut() {
                let _ = handle.await;
            }
        };

        let outcome = tokio::time::timeout(grace, done).await;
        match outcome {
            Ok(()) => Ok(()),
            Err(_) => {
                let mut stuck: Vec<&'static str> = tasks
                    .iter()
                    .filter(|(_, h)| !h.is_finished())
                    .map(|(name, _)| *name)
                    .collect();
                if listener.as_ref().is_some_and(|h| !h.is_finished()) {
                    stuck.push(EVENT_LISTENER);
                }
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Raises the shutdown signal without closing.
    ///
    /// The graceful flush scheduler stops, and later resets use the most
    /// severe level's soft timeout so pending data is flushed sooner.
    pub fn signal_shutdown(&self) {
        raise(&self.shutdown, &self.bus, "requested");
    }

    /// Spawns a task that waits for a termination signal, raises the shutdown
    /// signal and, in graceful mode, closes the appender.
    ///
    /// The task exits on its own once the appender closes gracefully.
    /// Must be called from within a tokio runtime.
    pub fn spawn_signal_watcher(&self) -> JoinHandle<()> {
        let coordinator = Arc::clone(&self.coordinator);
        let token = self.shutdown.clone();
        let bus = self.bus.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                res = shutdown::wait_for_shutdown_signal() => match res {
                    Ok(signal) => {
                        raise(&token, &bus, signal);
                        if coordinator.is_graceful() {
                            coordinator.close();
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to install signal handlers");
                    }
                },
            }
        })
    }

    /// Subscribes to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn state(&self) -> Lifecycle {
        self.coordinator.state()
    }

    /// Events written to the current file (reset on rollover).
    pub fn events_logged(&self) -> u64 {
        self.coordinator.events_logged()
    }

    pub fn base_name(&self) -> &str {
        self.coordinator.base_name()
    }

    /// Rollover timestamp identifying the current file.
    pub fn last_rollover_timestamp(&self) -> u64 {
        self.coordinator.last_rollover_timestamp()
    }

    fn spawn_tasks(&self, rt: &Handle, receiver: RequestReceiver) -> Vec<Task> {
        let worker = SyncWorker::new(
            Arc::clone(&self.syncer),
            receiver,
            self.bus.clone(),
            Arc::from(self.coordinator.base_name()),
        );
        let flusher = FlushScheduler::new(
            Arc::clone(&self.coordinator),
            self.check_period,
            self.shutdown.clone(),
        );
        vec![
            (SYNC_WORKER, rt.spawn(worker.run())),
            (FLUSH_SCHEDULER, rt.spawn(flusher.run())),
        ]
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    fn start_listener(&self, rt: &Handle) {
        let Some(subs) = lock(&self.subscribers).take() else {
            return;
        };
        if subs.is_empty() {
            return;
        }

        // Subscribe before spawning so the activation outcome is not missed.
        let rx = self.bus.subscribe();
        let stop = self.listener_stop.clone();
        let handle = rt.spawn(async move {
            let set = SubscriberSet::new(subs);
            forward(rx, &set, stop).await;
            set.shutdown().await;
        });
        *lock(&self.listener) = Some(handle);
    }
}

impl Drop for Appender {
    fn drop(&mut self) {
        if self.coordinator.is_graceful() {
            self.coordinator.close();
        }
    }
}

async fn forward(mut rx: broadcast::Receiver<Event>, set: &SubscriberSet, stop: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            ev = rx.recv() => match ev {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => {
                while let Ok(ev) = rx.try_recv() {
                    set.emit(&ev);
                }
                break;
            }
        }
    }
}

fn raise(token: &CancellationToken, bus: &Bus, source: &'static str) {
    if token.is_cancelled() {
        return;
    }
    token.cancel();
    bus.publish(Event::new(EventKind::ShutdownSignaled).with_reason(source));
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
