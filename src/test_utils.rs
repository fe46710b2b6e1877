//! Shared test doubles: a recording [`LogTarget`] and a recording [`Syncer`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{LogEvent, LogTarget, SyncMetadata, SyncRequest, Syncer};
use crate::error::BackendError;

/// One hook invocation seen by [`MockTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Activate(u64),
    Write(String),
    ShouldRollover,
    StartNewFile(u64),
    Flush,
    Close,
    SyncMetadata,
}

/// Shared, clonable call log.
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// In-memory target with switchable failures.
#[derive(Debug, Default)]
pub(crate) struct MockTarget {
    recorder: Recorder,
    rollover_after: Option<u64>,
    writes_in_file: u64,
    fail_activate: bool,
    fail_writes_containing: Option<String>,
    fail_should_rollover: bool,
    fail_start_new_file: bool,
    failing_flushes: u32,
    fail_close: bool,
}

impl MockTarget {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    /// Asks for a rollover once `n` events were written to the current file.
    pub(crate) fn rollover_after(mut self, n: u64) -> Self {
        self.rollover_after = Some(n);
        self
    }

    pub(crate) fn fail_activate(mut self) -> Self {
        self.fail_activate = true;
        self
    }

    pub(crate) fn fail_writes_containing(mut self, needle: &str) -> Self {
        self.fail_writes_containing = Some(needle.to_string());
        self
    }

    pub(crate) fn fail_should_rollover(mut self) -> Self {
        self.fail_should_rollover = true;
        self
    }

    pub(crate) fn fail_start_new_file(mut self) -> Self {
        self.fail_start_new_file = true;
        self
    }

    /// The next `n` flushes fail.
    pub(crate) fn fail_flushes(mut self, n: u32) -> Self {
        self.failing_flushes = n;
        self
    }

    pub(crate) fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl LogTarget for MockTarget {
    fn activate(&mut self, current_timestamp: u64) -> Result<(), BackendError> {
        self.recorder.push(Call::Activate(current_timestamp));
        if self.fail_activate {
            return Err(BackendError::fail("activate refused"));
        }
        Ok(())
    }

    fn write(&mut self, event: &LogEvent) -> Result<(), BackendError> {
        self.recorder.push(Call::Write(event.message.to_string()));
        if let Some(needle) = &self.fail_writes_containing {
            if event.message.contains(needle.as_str()) {
                return Err(BackendError::fail("write refused"));
            }
        }
        self.writes_in_file += 1;
        Ok(())
    }

    fn should_rollover(&self) -> Result<bool, BackendError> {
        self.recorder.push(Call::ShouldRollover);
        if self.fail_should_rollover {
            return Err(BackendError::fail("size unknown"));
        }
        Ok(self.rollover_after.is_some_and(|n| self.writes_in_file >= n))
    }

    fn start_new_file(&mut self, last_event_timestamp: u64) -> Result<(), BackendError> {
        self.recorder.push(Call::StartNewFile(last_event_timestamp));
        if self.fail_start_new_file {
            return Err(BackendError::fail("cannot open file"));
        }
        self.writes_in_file = 0;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        self.recorder.push(Call::Flush);
        if self.failing_flushes > 0 {
            self.failing_flushes -= 1;
            return Err(BackendError::fail("flush refused"));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.recorder.push(Call::Close);
        if self.fail_close {
            return Err(BackendError::fail("close refused"));
        }
        Ok(())
    }

    fn sync_metadata(&self) -> Option<SyncMetadata> {
        self.recorder.push(Call::SyncMetadata);
        None
    }
}

/// Syncer recording every attempt; fails or panics on chosen rollover timestamps.
#[derive(Debug, Default)]
pub(crate) struct MockSyncer {
    attempts: Mutex<Vec<SyncRequest>>,
    fail_on: HashSet<u64>,
    panic_on: HashSet<u64>,
    delay: Duration,
}

impl MockSyncer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_on(mut self, rollover_timestamp: u64) -> Self {
        self.fail_on.insert(rollover_timestamp);
        self
    }

    pub(crate) fn panic_on(mut self, rollover_timestamp: u64) -> Self {
        self.panic_on.insert(rollover_timestamp);
        self
    }

    /// Every sync sleeps this long first.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests seen so far, in call order.
    pub(crate) fn attempts(&self) -> Vec<SyncRequest> {
        self.attempts.lock().unwrap().clone()
    }

    /// `(rollover_timestamp, delete_file)` of every attempt.
    pub(crate) fn seen(&self) -> Vec<(u64, bool)> {
        self.attempts()
            .iter()
            .map(|r| (r.rollover_timestamp(), r.delete_file()))
            .collect()
    }
}

#[async_trait]
impl Syncer for MockSyncer {
    async fn sync(&self, request: &SyncRequest) -> Result<(), BackendError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.attempts.lock().unwrap().push(request.clone());

        let ts = request.rollover_timestamp();
        if self.panic_on.contains(&ts) {
            panic!("sync exploded for {ts}");
        }
        if self.fail_on.contains(&ts) {
            return Err(BackendError::fail("upload refused"));
        }
        Ok(())
    }

    fn file_name(&self, base_name: &str, rollover_timestamp: u64) -> String {
        format!("{base_name}.{rollover_timestamp}.log")
    }
}
