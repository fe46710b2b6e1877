//! # Example: local_files
//!
//! A rolling appender writing to a local directory and "syncing" finished or
//! stale files into a `synced/` subdirectory.
//!
//! Shows how to:
//! - Implement [`LogTarget`] (buffered file, size-based rollover).
//! - Implement [`Syncer`] (async copy, delete after sync when allowed).
//! - Override flush timeouts with the textual `LEVEL=value` lists.
//! - Render runtime events through `tracing-subscriber`.
//!
//! ## Flow
//! ```text
//! append() ──► app.<ts>.log (BufWriter)
//!    ├─ size > 4 KiB ──► Sync(app.<ts>.log, delete) ──► synced/app.<ts>.log, local removed
//!    └─ WARN/ERROR soft timeout ──► flush + Sync(current, keep) ──► synced/ copy refreshed
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=rollsync=debug cargo run --example local_files
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rollsync::{
    AppenderBuilder, AppenderConfig, BackendError, Clock, Level, LogEvent, LogTarget,
    SyncRequest, Syncer, SystemClock,
};
use tracing_subscriber::EnvFilter;

const MAX_FILE_BYTES: u64 = 4 * 1024;

fn file_name(base_name: &str, rollover_timestamp: u64) -> String {
    format!("{base_name}.{rollover_timestamp}.log")
}

/// Writes the current file as `<dir>/<base>.<rollover_ts>.log`.
struct LocalFiles {
    dir: Arc<PathBuf>,
    base_name: String,
    current: Option<BufWriter<File>>,
    written: u64,
}

impl LocalFiles {
    fn open(&mut self, rollover_timestamp: u64) -> Result<(), BackendError> {
        let path = self.dir.join(file_name(&self.base_name, rollover_timestamp));
        let file = File::options().create(true).append(true).open(path)?;
        self.current = Some(BufWriter::new(file));
        self.written = 0;
        Ok(())
    }

    fn current(&mut self) -> Result<&mut BufWriter<File>, BackendError> {
        self.current
            .as_mut()
            .ok_or_else(|| BackendError::fail("no open file"))
    }
}

impl LogTarget for LocalFiles {
    fn activate(&mut self, current_timestamp: u64) -> Result<(), BackendError> {
        fs::create_dir_all(self.dir.as_path())?;
        self.open(current_timestamp)
    }

    fn write(&mut self, event: &LogEvent) -> Result<(), BackendError> {
        let line = format!("{} {:<5} {}\n", event.timestamp, event.level, event.message);
        self.current()?.write_all(line.as_bytes())?;
        self.written += line.len() as u64;
        Ok(())
    }

    fn should_rollover(&self) -> Result<bool, BackendError> {
        Ok(self.written >= MAX_FILE_BYTES)
    }

    fn start_new_file(&mut self, last_event_timestamp: u64) -> Result<(), BackendError> {
        if let Some(mut old) = self.current.take() {
            old.flush()?;
        }
        self.open(last_event_timestamp)
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        self.current()?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if let Some(mut file) = self.current.take() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Copies files into `<dir>/synced/`.
struct CopyToSynced {
    dir: Arc<PathBuf>,
}

#[async_trait]
impl Syncer for CopyToSynced {
    async fn sync(&self, request: &SyncRequest) -> Result<(), BackendError> {
        let name = self.file_name(request.base_name(), request.rollover_timestamp());
        let source = self.dir.join(&name);
        let synced = self.dir.join("synced");

        tokio::fs::create_dir_all(&synced).await?;
        tokio::fs::copy(&source, synced.join(&name)).await?;
        if request.delete_file() {
            tokio::fs::remove_file(&source).await?;
        }
        Ok(())
    }

    fn file_name(&self, base_name: &str, rollover_timestamp: u64) -> String {
        file_name(base_name, rollover_timestamp)
    }
}

fn demo_dir() -> PathBuf {
    std::env::temp_dir().join("rollsync-demo")
}

fn list(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rollsync=debug")),
        )
        .init();

    let dir = Arc::new(demo_dir());
    if dir.exists() {
        fs::remove_dir_all(dir.as_path())?;
    }

    let mut cfg = AppenderConfig::new("app");
    cfg.check_period = Duration::from_millis(100);
    for rejected in cfg.set_flush_soft_timeouts_in_seconds("WARN=1,ERROR=1,FATAL=1,BOGUS=3") {
        tracing::warn!(label = rejected.as_label(), "skipped override: {rejected}");
    }

    let target = LocalFiles {
        dir: Arc::clone(&dir),
        base_name: cfg.base_name.clone(),
        current: None,
        written: 0,
    };
    let syncer = CopyToSynced {
        dir: Arc::clone(&dir),
    };

    let appender = AppenderBuilder::new(cfg, target, syncer).build();
    appender.activate()?;
    let _watcher = appender.spawn_signal_watcher();

    for i in 0..200u32 {
        let level = match i % 50 {
            0 => Level::Error,
            25 => Level::Warn,
            _ => Level::Info,
        };
        let now = SystemClock.now_millis();
        appender.append(&LogEvent::new(level, now, format!("event #{i}")))?;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tracing::info!(
        events_in_current_file = appender.events_logged(),
        current_file = appender.last_rollover_timestamp(),
        "done writing"
    );

    appender.shutdown(Duration::from_secs(5)).await?;

    println!("local:  {:?}", list(&dir)?);
    println!("synced: {:?}", list(&dir.join("synced"))?);
    Ok(())
}
