//! Structured audit sinks
//!
//! A sink receives finished [`FieldRecord`]s and persists them. Emission is
//! fire-and-forget from the caller's side: `emit` never blocks on I/O.
//!
//! [`QueuedAuditSink`] hands records to a dedicated writer thread over a bounded
//! queue. The writer appends one JSON object per line to a rolling file or to
//! stdout and flushes whenever the queue drains. A full queue is returned to the caller
//! as [`SinkError::QueueFull`] so the loss is always reported.

use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing_appender::rolling::RollingFileAppender;

use super::config::{AuditSinkConfig, SinkKind};
use super::record::FieldRecord;

/// Why a record could not be handed to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("audit queue is full")]
    QueueFull,

    #[error("audit sink is closed")]
    Closed,

    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("audit sink I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Destination for finished audit records
pub trait AuditSink: Send + Sync {
    /// Hand a record to the sink without waiting for it to be written
    fn emit(&self, record: FieldRecord) -> Result<(), SinkError>;

    /// Stop accepting records and wait until buffered ones are written
    ///
    /// Blocks the calling thread. Sinks without a buffer have nothing to do.
    fn close(&self) {}
}

/// Build the sink selected by configuration
pub fn open_sink(config: &AuditSinkConfig) -> Result<Arc<dyn AuditSink>, SinkError> {
    Ok(match config.sink {
        SinkKind::File => Arc::new(QueuedAuditSink::open_file(config)?),
        SinkKind::Stdout => Arc::new(QueuedAuditSink::stdout(config.queue_capacity)?),
    })
}

/// Buffered JSON-lines sink with a dedicated writer thread
pub struct QueuedAuditSink {
    tx: Mutex<Option<mpsc::Sender<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedAuditSink {
    /// Open a rolling file under the configured directory and start the writer
    pub fn open_file(config: &AuditSinkConfig) -> Result<Self, SinkError> {
        std::fs::create_dir_all(&config.directory)?;

        let appender = RollingFileAppender::builder()
            .rotation(config.rotation.into())
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_files.max(1))
            .build(&config.directory)
            .map_err(io::Error::other)?;

        tracing::info!(
            directory = %config.directory.display(),
            prefix = %config.file_prefix,
            rotation = ?config.rotation,
            "Audit file sink opened"
        );

        Self::with_writer(appender, config.queue_capacity)
    }

    /// Write records to stdout, one JSON line each
    pub fn stdout(capacity: usize) -> Result<Self, SinkError> {
        Self::with_writer(io::stdout(), capacity)
    }

    /// Start a writer thread over any byte sink
    pub fn with_writer<W>(writer: W, capacity: usize) -> Result<Self, SinkError>
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = std::thread::Builder::new()
            .name("audit-writer".to_string())
            .spawn(move || run_writer(rx, writer))?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(handle)),
        })
    }
}

impl AuditSink for QueuedAuditSink {
    fn emit(&self, record: FieldRecord) -> Result<(), SinkError> {
        let line = record.to_json_line()?;
        let guard = self.tx.lock().map_err(|_| SinkError::Closed)?;
        let tx = guard.as_ref().ok_or(SinkError::Closed)?;
        tx.try_send(line).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn close(&self) {
        // Dropping the sender lets the writer drain the queue and exit.
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let handle = self.writer.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Audit writer thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for QueuedAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedAuditSink").finish_non_exhaustive()
    }
}

fn run_writer<W: Write>(mut rx: mpsc::Receiver<String>, writer: W) {
    let mut out = BufWriter::new(writer);

    while let Some(line) = rx.blocking_recv() {
        write_line(&mut out, &line);
        while let Ok(line) = rx.try_recv() {
            write_line(&mut out, &line);
        }
        if let Err(e) = out.flush() {
            tracing::error!(error = %e, "Failed to flush audit output");
        }
    }

    if let Err(e) = out.flush() {
        tracing::error!(error = %e, "Failed to flush audit output on shutdown");
    }
}

fn write_line<W: Write>(out: &mut W, line: &str) {
    if let Err(e) = writeln!(out, "{line}") {
        tracing::error!(error = %e, "Failed to write audit record");
    }
}

/// Keeps records in memory, in emission order
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<FieldRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn records(&self) -> Vec<FieldRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, record: FieldRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Closed)?
            .push(record);
        Ok(())
    }
}
