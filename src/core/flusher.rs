//! # Flush scheduler: periodic freshness check.
//!
//! Every `check_period` the scheduler reads the clock and asks the coordinator
//! to flush if a deadline expired. The check itself takes the append lock, so
//! it is serialized with appends and close.
//!
//! ## Rules
//! - Graceful mode: the loop exits when the shutdown signal is raised, even mid-sleep.
//! - Abrupt mode: the signal is ignored; the loop runs until its task is dropped
//!   (once closed, each check is a no-op).
//! - A failed flush is published as `FlushFailed`; the next tick retries it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::coordinator::Coordinator;
use crate::events::{Event, EventKind};

pub(crate) struct FlushScheduler {
    coordinator: Arc<Coordinator>,
    period: Duration,
    shutdown: CancellationToken,
}

impl FlushScheduler {
    pub(crate) fn new(
        coordinator: Arc<Coordinator>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            period,
            shutdown,
        }
    }

    pub(crate) async fn run(self) {
        let graceful = self.coordinator.is_graceful();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled(), if graceful => break,
                _ = tokio::time::sleep(self.period) => {}
            }

            let now = self.coordinator.clock().now_millis();
            if let Err(e) = self.coordinator.flush_if_expired(now) {
                self.coordinator.bus().publish(
                    Event::new(EventKind::FlushFailed)
                        .with_base_name(self.coordinator.base_name())
                        .with_reason(e.to_string()),
                );
            }
        }
        self.coordinator.bus().publish(
            Event::new(EventKind::FlushSchedulerStopped)
                .with_base_name(self.coordinator.base_name()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LogEvent, ManualClock};
    use crate::core::config::AppenderConfig;
    use crate::core::queue::{Request, RequestQueue, RequestReceiver};
    use crate::events::Bus;
    use crate::freshness::Level;
    use crate::test_utils::{Call, MockTarget, Recorder};

    struct Fixture {
        coordinator: Arc<Coordinator>,
        clock: Arc<ManualClock>,
        rx: RequestReceiver,
        recorder: Recorder,
        bus: Bus,
        shutdown: CancellationToken,
    }

    fn fixture(close_on_shutdown: bool, target: MockTarget) -> Fixture {
        let mut cfg = AppenderConfig::new("app");
        cfg.close_on_shutdown = close_on_shutdown;
        cfg.timeouts.set_soft_timeout(Level::Error, Duration::from_secs(2));

        let recorder = target.recorder();
        let (queue, rx) = RequestQueue::new();
        let bus = Bus::new(64);
        let clock = Arc::new(ManualClock::new(0));
        let shutdown = CancellationToken::new();
        let coordinator = Arc::new(Coordinator::new(
            &cfg,
            Box::new(target),
            queue,
            bus.clone(),
            clock.clone(),
            shutdown.clone(),
        ));
        coordinator.activate(|| Ok(())).unwrap();
        Fixture {
            coordinator,
            clock,
            rx,
            recorder,
            bus,
            shutdown,
        }
    }

    fn spawn(fx: &Fixture) -> tokio::task::JoinHandle<()> {
        let scheduler = FlushScheduler::new(
            Arc::clone(&fx.coordinator),
            Duration::from_secs(1),
            fx.shutdown.clone(),
        );
        tokio::spawn(scheduler.run())
    }

    // The scheduler fires at whole seconds; tests observe half a period later.
    async fn offset() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    /// Advances the appender clock, then lets one scheduler tick pass.
    async fn tick(clock: &ManualClock) {
        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_flushes_once_the_soft_deadline_passes() {
        let mut fx = fixture(true, MockTarget::new());
        let handle = spawn(&fx);

        fx.coordinator
            .append(&LogEvent::new(Level::Error, 0, "boom"))
            .unwrap();
        offset().await;

        tick(&fx.clock).await;
        assert!(fx.rx.try_recv().is_err());

        tick(&fx.clock).await;
        match fx.rx.try_recv() {
            Ok(Request::Sync(req)) => {
                assert_eq!(req.rollover_timestamp(), 0);
                assert!(!req.delete_file());
            }
            other => panic!("expected a sync request, got {other:?}"),
        }

        tick(&fx.clock).await;
        assert!(fx.rx.try_recv().is_err());

        fx.shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_is_reported_and_retried() {
        let mut fx = fixture(true, MockTarget::new().fail_flushes(1));
        let mut events = fx.bus.subscribe();
        let handle = spawn(&fx);

        fx.coordinator
            .append(&LogEvent::new(Level::Error, 0, "boom"))
            .unwrap();
        fx.clock.set(2_000);
        offset().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(fx.rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(matches!(fx.rx.try_recv(), Ok(Request::Sync(_))));
        assert_eq!(fx.recorder.count(|c| matches!(c, Call::Flush)), 2);

        fx.shutdown.cancel();
        handle.await.unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::FlushFailed));
        assert_eq!(kinds.last(), Some(&EventKind::FlushSchedulerStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_scheduler_stops_on_signal_mid_sleep() {
        let fx = fixture(true, MockTarget::new());
        let handle = spawn(&fx);

        tokio::task::yield_now().await;
        fx.shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(fx.recorder.count(|c| matches!(c, Call::Flush)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abrupt_scheduler_ignores_signal() {
        let mut fx = fixture(false, MockTarget::new());
        let handle = spawn(&fx);
        fx.shutdown.cancel();

        fx.coordinator
            .append(&LogEvent::new(Level::Error, 0, "boom"))
            .unwrap();
        offset().await;
        tick(&fx.clock).await;
        tick(&fx.clock).await;

        assert!(!handle.is_finished());
        assert!(matches!(fx.rx.try_recv(), Ok(Request::Sync(_))));
        handle.abort();
    }
}
