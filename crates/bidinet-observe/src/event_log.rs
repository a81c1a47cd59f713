use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::{EventParams, EventSink, NetworkEvent};

pub const EVENT_LOG_SCHEMA: &str = "bidinet-event-log-v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogConfig {
    pub log_path: PathBuf,
    pub flush_every: usize,
}

impl EventLogConfig {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            flush_every: 1,
        }
    }

    pub fn with_flush_every(mut self, flush_every: usize) -> Self {
        self.flush_every = flush_every.max(1);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventLogRecord<'a> {
    pub schema: &'static str,
    pub sequence_id: u64,
    pub method: &'static str,
    pub top_context: &'a str,
    pub params: &'a EventParams,
}

#[derive(Debug)]
struct EventLogState {
    writer: BufWriter<File>,
    events_since_flush: usize,
}

/// Appends one JSON line per emitted event. Write failures are counted and
/// never reach the emitter.
#[derive(Debug)]
pub struct EventLogSink {
    config: EventLogConfig,
    state: Mutex<EventLogState>,
    next_sequence_id: AtomicU64,
    write_error_count: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl EventLogSink {
    pub fn new(config: EventLogConfig) -> io::Result<Self> {
        if config.log_path.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "event log path must not be empty",
            ));
        }

        ensure_parent_exists(&config.log_path)?;
        let writer = BufWriter::new(create_truncated_file(&config.log_path)?);
        Ok(Self {
            config,
            state: Mutex::new(EventLogState {
                writer,
                events_since_flush: 0,
            }),
            next_sequence_id: AtomicU64::new(1),
            write_error_count: AtomicU64::new(0),
            last_error: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.log_path
    }

    pub fn flush(&self) -> io::Result<()> {
        self.state.lock().writer.flush()
    }

    pub fn write_error_count(&self) -> u64 {
        self.write_error_count.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn write_event(&self, event: &NetworkEvent) -> io::Result<()> {
        let record = EventLogRecord {
            schema: EVENT_LOG_SCHEMA,
            sequence_id: self.next_sequence_id.fetch_add(1, Ordering::Relaxed),
            method: event.kind.as_str(),
            top_context: event.top_context.as_str(),
            params: &event.params,
        };
        let mut line = serde_json::to_vec(&record)
            .map_err(|error| io::Error::other(format!("serialize event log record: {error}")))?;
        line.push(b'\n');

        let mut state = self.state.lock();
        state.writer.write_all(&line)?;
        state.events_since_flush = state.events_since_flush.saturating_add(1);
        if state.events_since_flush >= self.config.flush_every {
            state.writer.flush()?;
            state.events_since_flush = 0;
        }
        Ok(())
    }
}

impl EventSink for EventLogSink {
    fn emit(&self, event: NetworkEvent) {
        if let Err(error) = self.write_event(&event) {
            self.write_error_count.fetch_add(1, Ordering::Relaxed);
            *self.last_error.lock() = Some(error.to_string());
            tracing::warn!(
                path = %self.config.log_path.display(),
                error = %error,
                "event log write failed"
            );
        }
    }
}

impl Drop for EventLogSink {
    fn drop(&mut self) {
        let _ = self.state.get_mut().writer.flush();
    }
}

fn ensure_parent_exists(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn create_truncated_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
}
