//! Writer backend implementations
//!
//! The backend set is a closed tagged union: each variant owns one bounded
//! inbound channel and (server excepted) one dedicated worker thread that
//! drains it in FIFO order, which carries the per-backend ordering
//! guarantee. Producers hand records over with a bounded wait and never
//! block on a slow sink beyond that.

pub mod callback;
pub mod client;
pub mod console;
pub mod file;
pub mod server;
pub mod wire;

pub use callback::{CallbackBackend, CallbackFn, CallbackWriterConfig};
pub use client::{ClientBackend, ClientWriterConfig};
pub use console::{ConsoleBackend, ConsoleTarget, ConsoleWriterConfig};
pub use file::{CompressionMethod, FileBackend, FileWriterConfig};
pub use server::{ServerBackend, ServerConfig};
pub use wire::AuthKey;

use crate::core::dispatcher::RecordInjector;
use crate::core::error::{LoggingError, Result};
use crate::core::level::LevelFilter;
use crate::core::metrics::DispatchMetrics;
use crate::core::record::Record;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Identifier handed back by `add_writer`.
pub type BackendId = usize;

/// Queue depth for the file worker.
pub(crate) const FILE_QUEUE_CAPACITY: usize = 10_000;
/// Queue depth for the other workers.
pub(crate) const WORKER_QUEUE_CAPACITY: usize = 1_000;
/// Bounded wait on a full queue before the record is dropped and counted.
pub(crate) const ENQUEUE_TIMEOUT: Duration = Duration::from_millis(50);

/// Commands flowing through a backend worker's channel.
pub(crate) enum Command {
    Record(Arc<Record>),
    /// Durability barrier; the worker flushes and acknowledges after all
    /// previously enqueued records were processed.
    Sync(Sender<()>),
    /// Force a file rotation; ignored by non-file workers.
    Rotate,
    Stop,
}

/// Hand a record to a worker without ever blocking the producer
/// indefinitely: try, wait the bounded timeout, then drop and count.
pub(crate) fn enqueue_record(
    name: &str,
    tx: &Sender<Command>,
    record: Arc<Record>,
    metrics: &DispatchMetrics,
) {
    match tx.try_send(Command::Record(record)) {
        Ok(()) => {}
        Err(TrySendError::Full(command)) => {
            metrics.record_queue_full();
            if tx.send_timeout(command, ENQUEUE_TIMEOUT).is_err() {
                let dropped_before = metrics.record_dropped();
                if dropped_before == 0 {
                    eprintln!(
                        "[LOGGER WARNING] {name} queue full, records are being dropped. \
                         Consider a slower emit rate or a faster sink."
                    );
                }
            }
        }
        Err(TrySendError::Disconnected(_)) => {
            // Worker died; backend is degraded.
            metrics.record_dropped();
        }
    }
}

/// Shared sync barrier: enqueue the marker and wait for the worker's
/// acknowledgment, both bounded by the caller's deadline.
pub(crate) fn sync_worker(tx: &Sender<Command>, deadline: Instant) -> bool {
    let (ack_tx, ack_rx) = bounded(1);
    if tx.send_deadline(Command::Sync(ack_tx), deadline).is_err() {
        return false;
    }
    ack_rx.recv_deadline(deadline).is_ok()
}

/// Shared worker teardown: a stop marker behind every accepted record plus
/// a join makes shutdown a complete drain. Idempotent.
pub(crate) fn shutdown_worker(
    name: &str,
    tx: &Sender<Command>,
    handle: &Mutex<Option<JoinHandle<()>>>,
) -> Result<()> {
    let handle = handle.lock().take();
    if let Some(handle) = handle {
        // A send failure means the worker is already gone; still join it.
        let _ = tx.send(Command::Stop);
        handle
            .join()
            .map_err(|_| LoggingError::join(name, "worker thread panicked"))?;
    }
    Ok(())
}

/// A recipe for constructing one writer backend.
#[derive(Debug, Clone)]
pub enum WriterConfig {
    Console(ConsoleWriterConfig),
    File(FileWriterConfig),
    Callback(CallbackWriterConfig),
    Server(ServerConfig),
    Client(ClientWriterConfig),
}

impl From<ConsoleWriterConfig> for WriterConfig {
    fn from(config: ConsoleWriterConfig) -> Self {
        WriterConfig::Console(config)
    }
}

impl From<FileWriterConfig> for WriterConfig {
    fn from(config: FileWriterConfig) -> Self {
        WriterConfig::File(config)
    }
}

impl From<CallbackWriterConfig> for WriterConfig {
    fn from(config: CallbackWriterConfig) -> Self {
        WriterConfig::Callback(config)
    }
}

impl From<ServerConfig> for WriterConfig {
    fn from(config: ServerConfig) -> Self {
        WriterConfig::Server(config)
    }
}

impl From<ClientWriterConfig> for WriterConfig {
    fn from(config: ClientWriterConfig) -> Self {
        WriterConfig::Client(config)
    }
}

/// One live backend.
pub(crate) enum Backend {
    Console(ConsoleBackend),
    File(FileBackend),
    Callback(CallbackBackend),
    Server(ServerBackend),
    Client(ClientBackend),
}

impl Backend {
    pub(crate) fn build(
        config: WriterConfig,
        injector: RecordInjector,
        metrics: Arc<DispatchMetrics>,
    ) -> Result<Backend> {
        Ok(match config {
            WriterConfig::Console(config) => Backend::Console(ConsoleBackend::new(config)?),
            WriterConfig::File(config) => Backend::File(FileBackend::new(config, metrics)?),
            WriterConfig::Callback(config) => Backend::Callback(CallbackBackend::new(config)?),
            WriterConfig::Server(config) => Backend::Server(ServerBackend::new(config, injector)?),
            WriterConfig::Client(config) => Backend::Client(ClientBackend::new(config, metrics)?),
        })
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Backend::Console(_) => "console",
            Backend::File(_) => "file",
            Backend::Callback(_) => "callback",
            Backend::Server(_) => "server",
            Backend::Client(_) => "client",
        }
    }

    pub(crate) fn filter(&self) -> &LevelFilter {
        match self {
            Backend::Console(b) => b.filter(),
            Backend::File(b) => b.filter(),
            Backend::Callback(b) => b.filter(),
            Backend::Server(b) => b.filter(),
            Backend::Client(b) => b.filter(),
        }
    }

    /// Hand an admitted record to this backend. The server backend is
    /// ingress-only and ignores local records.
    pub(crate) fn enqueue(&self, record: &Arc<Record>, metrics: &DispatchMetrics) {
        match self {
            Backend::Console(b) => {
                enqueue_record("ConsoleWriter", b.sender(), Arc::clone(record), metrics)
            }
            Backend::File(b) => {
                enqueue_record("FileWriter", b.sender(), Arc::clone(record), metrics)
            }
            Backend::Callback(b) => {
                enqueue_record("CallbackWriter", b.sender(), Arc::clone(record), metrics)
            }
            Backend::Server(_) => {}
            Backend::Client(b) => {
                enqueue_record("ClientWriter", b.sender(), Arc::clone(record), metrics)
            }
        }
    }

    pub(crate) fn sync(&self, deadline: Instant) -> bool {
        match self {
            Backend::Console(b) => b.sync(deadline),
            Backend::File(b) => b.sync(deadline),
            Backend::Callback(b) => b.sync(deadline),
            Backend::Server(_) => true,
            Backend::Client(b) => b.sync(deadline),
        }
    }

    pub(crate) fn rotate(&self) -> Result<()> {
        match self {
            Backend::File(b) => b.rotate(),
            _ => Ok(()),
        }
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        match self {
            Backend::Console(b) => b.shutdown(),
            Backend::File(b) => b.shutdown(),
            Backend::Callback(b) => b.shutdown(),
            Backend::Server(b) => b.shutdown(),
            Backend::Client(b) => b.shutdown(),
        }
    }

    pub(crate) fn as_server(&self) -> Option<&ServerBackend> {
        match self {
            Backend::Server(b) => Some(b),
            _ => None,
        }
    }
}
