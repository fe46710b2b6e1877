//! # Append coordinator: one lock for append, flush and close.
//!
//! The coordinator owns everything that must stay consistent across producer
//! threads and the flush scheduler: the [`LogTarget`], the
//! [`FreshnessTracker`], the logged-event counter and the identity of the
//! current file (`last_rollover_ts`). All of it lives behind one mutex.
//!
//! ## Paths
//! ```text
//! append(event)
//!   ├─ target.write(event)            Err → WriteFailed, stop (nothing mutated)
//!   ├─ events_logged += 1
//!   └─ target.should_rollover()
//!        ├─ Err   → WriteFailed
//!        ├─ false → tracker.on_event(level, ts)
//!        └─ true  → queue Sync(current file, delete=true)
//!                   tracker.reset()
//!                   last_rollover_ts = event.ts
//!                   target.start_new_file(ts)   Err → RolloverFailed
//!                   events_logged = 0
//!
//! flush_if_expired(now)
//!   └─ tracker.is_expired(now)?
//!        └─ target.flush()?  → queue Sync(current file, delete=false) → tracker.reset()
//!
//! close()                                      (once)
//!   ├─ graceful: target.close(), queue Sync(delete=true), queue Shutdown, raise signal
//!   └─ abrupt:   target.flush(), queue Sync(delete=false)
//! ```
//!
//! ## Rules
//! - Only one of append / flush check / close runs at a time.
//! - A sync request for a file is queued before anything is written to its successor.
//! - Nothing is queued after `Shutdown`: close flips the state under the same lock.
//! - Resets performed while the shutdown signal is raised use the most severe
//!   soft timeout as the ceiling.
//! - The queue is independent of this lock: a slow sync never blocks producers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::backend::{Clock, LogEvent, LogTarget};
use crate::core::config::AppenderConfig;
use crate::core::queue::RequestQueue;
use crate::error::{AppenderError, BackendError};
use crate::events::{Bus, Event, EventKind};
use crate::freshness::FreshnessTracker;

/// Appender lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Active,
    Closed,
}

/// State guarded by the append lock.
struct Inner {
    state: Lifecycle,
    target: Box<dyn LogTarget>,
    tracker: FreshnessTracker,
    last_rollover_ts: u64,
    events_logged: u64,
}

/// Serializes append, scheduled flush and close.
pub(crate) struct Coordinator {
    base_name: Arc<str>,
    graceful: bool,
    inner: Mutex<Inner>,
    queue: RequestQueue,
    bus: Bus,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl Coordinator {
    pub(crate) fn new(
        cfg: &AppenderConfig,
        target: Box<dyn LogTarget>,
        queue: RequestQueue,
        bus: Bus,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            base_name: Arc::from(cfg.base_name.as_str()),
            graceful: cfg.close_on_shutdown,
            inner: Mutex::new(Inner {
                state: Lifecycle::Uninitialized,
                target,
                tracker: FreshnessTracker::new(cfg.timeouts),
                last_rollover_ts: 0,
                events_logged: 0,
            }),
            queue,
            bus,
            clock,
            shutdown,
        }
    }

    /// Activates the target, then runs `start` (which launches the background
    /// tasks). Any failure closes the coordinator for good.
    pub(crate) fn activate<T>(
        &self,
        start: impl FnOnce() -> Result<T, String>,
    ) -> Result<T, AppenderError> {
        let mut inner = self.lock();
        match inner.state {
            Lifecycle::Uninitialized => {}
            Lifecycle::Active => return Err(self.reject_activation(AppenderError::AlreadyActive)),
            Lifecycle::Closed => return Err(self.reject_activation(AppenderError::Closed)),
        }

        inner.tracker.reset(self.shutting_down());
        let now = self.clock.now_millis();
        inner.last_rollover_ts = now;

        let started = inner
            .target
            .activate(now)
            .map_err(|e| e.to_string())
            .and_then(|()| start());

        match started {
            Ok(value) => {
                inner.state = Lifecycle::Active;
                self.bus.publish(self.event(EventKind::Activated).with_rollover_ts(now));
                Ok(value)
            }
            Err(error) => {
                inner.state = Lifecycle::Closed;
                self.bus
                    .publish(self.event(EventKind::ActivationFailed).with_reason(error.as_str()));
                Err(AppenderError::Activation { error })
            }
        }
    }

    /// Writes one event and updates freshness or rolls over.
    ///
    /// Hook failures are published on the bus; only lifecycle misuse is returned.
    pub(crate) fn append(&self, event: &LogEvent) -> Result<(), AppenderError> {
        let mut inner = self.lock();
        match inner.state {
            Lifecycle::Active => {}
            Lifecycle::Uninitialized => return Err(AppenderError::NotActive),
            Lifecycle::Closed => return Err(AppenderError::Closed),
        }

        if let Err(e) = inner.target.write(event) {
            self.publish_failure(EventKind::WriteFailed, &e);
            return Ok(());
        }
        inner.events_logged += 1;

        match inner.target.should_rollover() {
            Ok(false) => inner.tracker.on_event(event.level, event.timestamp),
            Ok(true) => self.rollover(&mut inner, event.timestamp),
            Err(e) => self.publish_failure(EventKind::WriteFailed, &e),
        }
        Ok(())
    }

    fn rollover(&self, inner: &mut Inner, timestamp: u64) {
        let metadata = inner.target.sync_metadata();
        self.queue
            .add_sync_request(&self.base_name, inner.last_rollover_ts, true, metadata);
        inner.tracker.reset(self.shutting_down());
        inner.last_rollover_ts = timestamp;

        match inner.target.start_new_file(timestamp) {
            Ok(()) => {
                inner.events_logged = 0;
                self.bus
                    .publish(self.event(EventKind::RolledOver).with_rollover_ts(timestamp));
            }
            Err(e) => {
                self.bus.publish(
                    self.event(EventKind::RolloverFailed)
                        .with_rollover_ts(timestamp)
                        .with_reason(e.to_string()),
                );
            }
        }
    }

    /// Flushes and queues a sync of the current file if a deadline expired.
    ///
    /// Returns `Ok(true)` when a flush happened. On a flush error nothing is
    /// queued and the deadlines are kept, so the next check retries the flush.
    pub(crate) fn flush_if_expired(&self, now: u64) -> Result<bool, BackendError> {
        let mut inner = self.lock();
        if inner.state != Lifecycle::Active || !inner.tracker.is_expired(now) {
            return Ok(false);
        }

        inner.target.flush()?;
        let metadata = inner.target.sync_metadata();
        self.queue
            .add_sync_request(&self.base_name, inner.last_rollover_ts, false, metadata);
        inner.tracker.reset(self.shutting_down());

        self.bus
            .publish(self.event(EventKind::Flushed).with_rollover_ts(inner.last_rollover_ts));
        Ok(true)
    }

    /// Closes the appender once; later calls are no-ops returning `false`.
    pub(crate) fn close(&self) -> bool {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            Lifecycle::Closed => return false,
            Lifecycle::Uninitialized => {
                inner.state = Lifecycle::Closed;
                drop(inner);
                self.bus.publish(self.event(EventKind::Closed));
                return true;
            }
            Lifecycle::Active => {}
        }

        let last_rollover_ts = inner.last_rollover_ts;
        if self.graceful {
            if let Err(e) = inner.target.close() {
                self.publish_failure(EventKind::CloseFailed, &e);
            }
            let metadata = inner.target.sync_metadata();
            self.queue
                .add_sync_request(&self.base_name, last_rollover_ts, true, metadata);
            self.queue.add_shutdown_request();
        } else {
            // Flush now in case the process exits before a deadline does.
            if let Err(e) = inner.target.flush() {
                self.publish_failure(EventKind::FlushFailed, &e);
            }
            let metadata = inner.target.sync_metadata();
            self.queue
                .add_sync_request(&self.base_name, last_rollover_ts, false, metadata);
        }
        inner.state = Lifecycle::Closed;
        drop(inner);

        self.bus.publish(
            self.event(EventKind::Closed)
                .with_rollover_ts(last_rollover_ts)
                .with_delete_file(self.graceful),
        );
        if self.graceful {
            self.shutdown.cancel();
        }
        true
    }

    pub(crate) fn state(&self) -> Lifecycle {
        self.lock().state
    }

    pub(crate) fn events_logged(&self) -> u64 {
        self.lock().events_logged
    }

    pub(crate) fn last_rollover_timestamp(&self) -> u64 {
        self.lock().last_rollover_ts
    }

    pub(crate) fn base_name(&self) -> &str {
        &self.base_name
    }

    pub(crate) fn is_graceful(&self) -> bool {
        self.graceful
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    #[inline]
    fn shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // Every mutation under the lock is a single assignment or a hook call, so
    // the state is still coherent if a hook panicked while holding it.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_base_name(Arc::clone(&self.base_name))
    }

    fn publish_failure(&self, kind: EventKind, err: &BackendError) {
        self.bus.publish(self.event(kind).with_reason(err.to_string()));
    }

    fn reject_activation(&self, err: AppenderError) -> AppenderError {
        self.bus
            .publish(self.event(EventKind::ActivationRejected).with_reason(err.to_string()));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ManualClock, SyncRequest};
    use crate::core::queue::{Request, RequestReceiver};
    use crate::freshness::Level;
    use crate::test_utils::{Call, MockTarget, Recorder};
    use std::time::Duration;

    struct Fixture {
        coordinator: Coordinator,
        rx: RequestReceiver,
        recorder: Recorder,
        clock: Arc<ManualClock>,
        events: tokio::sync::broadcast::Receiver<Event>,
        shutdown: CancellationToken,
    }

    fn fixture_with(cfg: AppenderConfig, target: MockTarget) -> Fixture {
        let recorder = target.recorder();
        let (queue, rx) = RequestQueue::new();
        let bus = Bus::new(64);
        let events = bus.subscribe();
        let clock = Arc::new(ManualClock::new(1_000));
        let shutdown = CancellationToken::new();
        let coordinator = Coordinator::new(
            &cfg,
            Box::new(target),
            queue,
            bus,
            clock.clone(),
            shutdown.clone(),
        );
        Fixture {
            coordinator,
            rx,
            recorder,
            clock,
            events,
            shutdown,
        }
    }

    fn active(cfg: AppenderConfig, target: MockTarget) -> Fixture {
        let fx = fixture_with(cfg, target);
        fx.coordinator.activate(|| Ok(())).unwrap();
        fx
    }

    fn drain(rx: &mut RequestReceiver) -> Vec<Request> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn sync(ts: u64, delete_file: bool) -> Request {
        Request::Sync(SyncRequest::new("app", ts, delete_file, None))
    }

    fn kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect()
    }

    fn fatal_cfg() -> AppenderConfig {
        let mut cfg = AppenderConfig::new("app");
        cfg.timeouts.set_hard_timeout(Level::Fatal, Duration::from_millis(1000));
        cfg.timeouts.set_soft_timeout(Level::Fatal, Duration::from_millis(100));
        cfg
    }

    #[test]
    fn test_activate_records_first_rollover_timestamp() {
        let fx = active(AppenderConfig::new("app"), MockTarget::new());
        assert_eq!(fx.coordinator.state(), Lifecycle::Active);
        assert_eq!(fx.coordinator.last_rollover_timestamp(), 1_000);
        assert_eq!(fx.recorder.calls(), vec![Call::Activate(1_000)]);
    }

    #[test]
    fn test_activate_twice_is_rejected_without_state_change() {
        let mut fx = active(AppenderConfig::new("app"), MockTarget::new());
        let err = fx.coordinator.activate(|| Ok(())).unwrap_err();
        assert_eq!(err, AppenderError::AlreadyActive);
        assert_eq!(fx.coordinator.state(), Lifecycle::Active);
        assert_eq!(
            kinds(&mut fx.events),
            vec![EventKind::Activated, EventKind::ActivationRejected]
        );
    }

    #[test]
    fn test_failed_activation_closes_permanently() {
        let mut fx = fixture_with(AppenderConfig::new("app"), MockTarget::new().fail_activate());
        let err = fx.coordinator.activate(|| Ok(())).unwrap_err();
        assert_eq!(err.as_label(), "appender_activation_failed");
        assert_eq!(fx.coordinator.state(), Lifecycle::Closed);

        assert_eq!(
            fx.coordinator.append(&LogEvent::new(Level::Info, 1, "x")),
            Err(AppenderError::Closed)
        );
        assert_eq!(
            fx.coordinator.activate(|| Ok(())).unwrap_err(),
            AppenderError::Closed
        );
        assert_eq!(
            kinds(&mut fx.events),
            vec![EventKind::ActivationFailed, EventKind::ActivationRejected]
        );
    }

    #[test]
    fn test_failed_start_closes_permanently() {
        let fx = fixture_with(AppenderConfig::new("app"), MockTarget::new());
        let err = fx
            .coordinator
            .activate::<()>(|| Err("no runtime".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            AppenderError::Activation {
                error: "no runtime".into()
            }
        );
        assert_eq!(fx.coordinator.state(), Lifecycle::Closed);
    }

    #[test]
    fn test_append_before_activate_is_rejected() {
        let fx = fixture_with(AppenderConfig::new("app"), MockTarget::new());
        assert_eq!(
            fx.coordinator.append(&LogEvent::new(Level::Info, 1, "x")),
            Err(AppenderError::NotActive)
        );
        assert!(fx.recorder.calls().is_empty());
    }

    #[test]
    fn test_append_counts_and_tracks_freshness() {
        let mut fx = active(fatal_cfg(), MockTarget::new());

        fx.coordinator.append(&LogEvent::new(Level::Fatal, 0, "a")).unwrap();
        fx.coordinator.append(&LogEvent::new(Level::Fatal, 50, "b")).unwrap();
        assert_eq!(fx.coordinator.events_logged(), 2);

        assert!(!fx.coordinator.flush_if_expired(149).unwrap());
        assert!(drain(&mut fx.rx).is_empty());

        assert!(fx.coordinator.flush_if_expired(150).unwrap());
        assert_eq!(drain(&mut fx.rx), vec![sync(1_000, false)]);

        // reset: nothing left to flush
        assert!(!fx.coordinator.flush_if_expired(10_000).unwrap());
        assert!(drain(&mut fx.rx).is_empty());
        assert_eq!(fx.recorder.count(|c| matches!(c, Call::Flush)), 1);
    }

    #[test]
    fn test_write_failure_drops_only_that_event() {
        let mut fx = active(fatal_cfg(), MockTarget::new().fail_writes_containing("bad"));

        fx.coordinator.append(&LogEvent::new(Level::Fatal, 0, "bad")).unwrap();
        assert_eq!(fx.coordinator.events_logged(), 0);
        // tracker untouched: nothing to flush
        assert!(!fx.coordinator.flush_if_expired(u64::MAX - 1).unwrap());

        fx.coordinator.append(&LogEvent::new(Level::Fatal, 0, "good")).unwrap();
        assert_eq!(fx.coordinator.events_logged(), 1);
        assert!(fx.coordinator.flush_if_expired(100).unwrap());

        let seen = kinds(&mut fx.events);
        assert!(seen.contains(&EventKind::WriteFailed));
        assert_eq!(drain(&mut fx.rx), vec![sync(1_000, false)]);
    }

    #[test]
    fn test_rollover_queues_old_file_before_starting_new_one() {
        let target = MockTarget::new().rollover_after(2);
        let mut fx = active(AppenderConfig::new("app"), target);

        fx.coordinator.append(&LogEvent::new(Level::Info, 10, "a")).unwrap();
        assert_eq!(fx.coordinator.events_logged(), 1);
        fx.coordinator.append(&LogEvent::new(Level::Error, 20, "b")).unwrap();

        assert_eq!(fx.coordinator.events_logged(), 0);
        assert_eq!(fx.coordinator.last_rollover_timestamp(), 20);
        assert_eq!(drain(&mut fx.rx), vec![sync(1_000, true)]);

        // metadata is captured when the request is queued, before the new file
        let calls = fx.recorder.calls();
        let started = calls.iter().position(|c| *c == Call::StartNewFile(20));
        let queued = calls.iter().position(|c| *c == Call::SyncMetadata);
        assert!(queued.unwrap() < started.unwrap());

        // tracker was reset, so the ERROR event did not arm a deadline
        assert!(!fx.coordinator.flush_if_expired(u64::MAX - 1).unwrap());
        assert!(kinds(&mut fx.events).contains(&EventKind::RolledOver));
    }

    #[test]
    fn test_failed_new_file_keeps_counter_and_reports() {
        let target = MockTarget::new().rollover_after(1).fail_start_new_file();
        let mut fx = active(AppenderConfig::new("app"), target);

        fx.coordinator.append(&LogEvent::new(Level::Info, 10, "a")).unwrap();
        assert_eq!(fx.coordinator.events_logged(), 1);
        assert_eq!(drain(&mut fx.rx), vec![sync(1_000, true)]);
        assert!(kinds(&mut fx.events).contains(&EventKind::RolloverFailed));
    }

    #[test]
    fn test_rollover_query_failure_is_a_write_failure() {
        let target = MockTarget::new().fail_should_rollover();
        let mut fx = active(AppenderConfig::new("app"), target);

        fx.coordinator.append(&LogEvent::new(Level::Fatal, 10, "a")).unwrap();
        assert_eq!(fx.coordinator.events_logged(), 1);
        assert!(!fx.coordinator.flush_if_expired(u64::MAX - 1).unwrap());
        assert!(kinds(&mut fx.events).contains(&EventKind::WriteFailed));
    }

    #[test]
    fn test_failed_flush_queues_nothing_and_keeps_deadlines() {
        let mut fx = active(fatal_cfg(), MockTarget::new().fail_flushes(1));
        fx.coordinator.append(&LogEvent::new(Level::Fatal, 0, "a")).unwrap();

        assert!(fx.coordinator.flush_if_expired(100).is_err());
        assert!(drain(&mut fx.rx).is_empty());

        assert!(fx.coordinator.flush_if_expired(100).unwrap());
        assert_eq!(drain(&mut fx.rx), vec![sync(1_000, false)]);
    }

    #[test]
    fn test_graceful_close_runs_once() {
        let mut fx = active(AppenderConfig::new("app"), MockTarget::new());

        assert!(fx.coordinator.close());
        assert!(!fx.coordinator.close());

        assert_eq!(
            drain(&mut fx.rx),
            vec![sync(1_000, true), Request::Shutdown]
        );
        assert_eq!(fx.recorder.count(|c| matches!(c, Call::Close)), 1);
        assert!(fx.shutdown.is_cancelled());
        assert_eq!(fx.coordinator.state(), Lifecycle::Closed);
        assert_eq!(
            fx.coordinator.append(&LogEvent::new(Level::Info, 1, "x")),
            Err(AppenderError::Closed)
        );
        assert!(!fx.coordinator.flush_if_expired(u64::MAX - 1).unwrap());
    }

    #[test]
    fn test_close_hook_failure_still_queues_final_sync() {
        let mut fx = active(AppenderConfig::new("app"), MockTarget::new().fail_close());
        assert!(fx.coordinator.close());
        assert_eq!(
            drain(&mut fx.rx),
            vec![sync(1_000, true), Request::Shutdown]
        );
        assert!(kinds(&mut fx.events).contains(&EventKind::CloseFailed));
    }

    #[test]
    fn test_abrupt_close_flushes_and_keeps_worker_alive() {
        let mut cfg = AppenderConfig::new("app");
        cfg.close_on_shutdown = false;
        let mut fx = active(cfg, MockTarget::new());

        assert!(fx.coordinator.close());
        assert!(!fx.coordinator.close());

        assert_eq!(drain(&mut fx.rx), vec![sync(1_000, false)]);
        assert_eq!(fx.recorder.count(|c| matches!(c, Call::Flush)), 1);
        assert_eq!(fx.recorder.count(|c| matches!(c, Call::Close)), 0);
        assert!(!fx.shutdown.is_cancelled());
    }

    #[test]
    fn test_close_before_activate_touches_nothing() {
        let mut fx = fixture_with(AppenderConfig::new("app"), MockTarget::new());
        assert!(fx.coordinator.close());
        assert_eq!(fx.coordinator.state(), Lifecycle::Closed);
        assert!(drain(&mut fx.rx).is_empty());
        assert!(fx.recorder.calls().is_empty());
        assert!(fx.coordinator.activate(|| Ok(())).is_err());
    }

    #[test]
    fn test_resets_during_shutdown_tighten_soft_ceiling() {
        let fx = active(AppenderConfig::new("app"), MockTarget::new());
        fx.shutdown.cancel();
        fx.clock.set(0);

        // first epoch was armed before the signal: DEBUG soft = 3 min
        fx.coordinator.append(&LogEvent::new(Level::Debug, 0, "a")).unwrap();
        assert!(!fx.coordinator.flush_if_expired(5_000).unwrap());
        assert!(fx.coordinator.flush_if_expired(180_000).unwrap());

        // after a reset under the signal, FATAL's 5 s is the ceiling
        fx.coordinator.append(&LogEvent::new(Level::Debug, 200_000, "b")).unwrap();
        assert!(fx.coordinator.flush_if_expired(205_000).unwrap());
    }
}
