//! Network client backend
//!
//! Ships admitted records to a logging server as wire frames. The initial
//! connection and handshake happen at construction so configuration and
//! authentication faults surface synchronously; later disconnects trigger
//! reconnection with capped exponential backoff on the worker, never
//! blocking producers.

use super::wire::{send_handshake, write_frame, AuthKey};
use super::{shutdown_worker, sync_worker, Command, WORKER_QUEUE_CAPACITY};
use crate::core::error::{LoggingError, Result};
use crate::core::level::{LevelFilter, LogLevel};
use crate::core::metrics::DispatchMetrics;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::io::{BufWriter, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClientWriterConfig {
    pub level: LogLevel,
    pub address: String,
    pub auth_key: AuthKey,
}

impl ClientWriterConfig {
    pub fn new(level: LogLevel, address: impl Into<String>, auth_key: AuthKey) -> Self {
        Self {
            level,
            address: address.into(),
            auth_key,
        }
    }
}

fn connect_and_auth(address: &str, key: &AuthKey) -> Result<TcpStream> {
    let mut stream = TcpStream::connect(address).map_err(|e| {
        LoggingError::config(
            "ClientWriter",
            format!("unreachable address '{}': {}", address, e),
        )
    })?;
    stream.set_nodelay(true)?;
    stream.set_write_timeout(Some(IO_TIMEOUT))?;
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    send_handshake(&mut stream, key)?;
    Ok(stream)
}

struct ClientWorker {
    address: String,
    key: AuthKey,
    stream: Option<BufWriter<TcpStream>>,
    backoff: Duration,
    outage_reported: bool,
    metrics: Arc<DispatchMetrics>,
}

impl ClientWorker {
    fn ensure_connected(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        match connect_and_auth(&self.address, &self.key) {
            Ok(stream) => {
                self.stream = Some(BufWriter::new(stream));
                self.backoff = INITIAL_BACKOFF;
                self.outage_reported = false;
                true
            }
            Err(e) => {
                if !self.outage_reported {
                    eprintln!(
                        "[LOGGER WARNING] ClientWriter lost connection to {}: {}. Retrying with backoff.",
                        self.address, e
                    );
                    self.outage_reported = true;
                }
                thread::sleep(self.backoff);
                self.backoff = (self.backoff * 2).min(MAX_BACKOFF);
                false
            }
        }
    }

    fn send_record(&mut self, level: LogLevel, domain: &str, message: &str) {
        if !self.ensure_connected() {
            self.metrics.record_dropped();
            return;
        }
        if let Some(ref mut stream) = self.stream {
            if let Err(e) = write_frame(stream, level, domain, message) {
                eprintln!("[LOGGER ERROR] ClientWriter send failed: {}", e);
                self.stream = None;
                self.metrics.record_dropped();
            }
        }
    }

    fn flush(&mut self) {
        if let Some(ref mut stream) = self.stream {
            if stream.flush().is_err() {
                self.stream = None;
            }
        }
    }
}

fn client_writer_thread(mut worker: ClientWorker, rx: Receiver<Command>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Record(record) => {
                worker.send_record(record.level, &record.domain, &record.message);
            }
            Command::Sync(ack) => {
                // Client sync means: outbound queue drained and flushed to
                // the socket, not server-side durability.
                worker.flush();
                let _ = ack.send(());
            }
            Command::Rotate => {}
            Command::Stop => break,
        }
    }
    worker.flush();
}

pub struct ClientBackend {
    filter: LevelFilter,
    address: String,
    tx: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ClientBackend {
    pub(crate) fn new(config: ClientWriterConfig, metrics: Arc<DispatchMetrics>) -> Result<Self> {
        // Connect and authenticate up front so a bad address or key fails
        // the add_writer call instead of a background worker.
        let stream = connect_and_auth(&config.address, &config.auth_key)?;

        let filter = LevelFilter::new(config.level);
        let worker = ClientWorker {
            address: config.address.clone(),
            key: config.auth_key,
            stream: Some(BufWriter::new(stream)),
            backoff: INITIAL_BACKOFF,
            outage_reported: false,
            metrics,
        };
        let (tx, rx) = bounded(WORKER_QUEUE_CAPACITY);
        let handle = thread::Builder::new()
            .name("ClientWriter".to_string())
            .spawn(move || client_writer_thread(worker, rx))?;
        Ok(Self {
            filter,
            address: config.address,
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn filter(&self) -> &LevelFilter {
        &self.filter
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn sender(&self) -> &Sender<Command> {
        &self.tx
    }

    pub(crate) fn sync(&self, deadline: Instant) -> bool {
        sync_worker(&self.tx, deadline)
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        shutdown_worker("ClientWriter", &self.tx, &self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_fails_fast_on_unreachable_address() {
        let config = ClientWriterConfig::new(
            LogLevel::Trace,
            "127.0.0.1:1",
            AuthKey::from_bytes(vec![1u8; 32]),
        );
        let result = ClientBackend::new(config, Arc::new(DispatchMetrics::new()));
        assert!(matches!(result, Err(LoggingError::Config { .. })));
    }
}
