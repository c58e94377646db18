//! Record dispatch and backend registry
//!
//! The registry is a copy-on-write snapshot: `emit` clones an `Arc` to the
//! current backend vector under a read lock and fans out without holding
//! it, so steady-state emission only serializes producers against the rare
//! registry mutation, never against each other's sinks.

use super::enricher::Enricher;
use super::error::{LoggingError, Result};
use super::ext_config::ExtConfig;
use super::level::LogLevel;
use super::metrics::DispatchMetrics;
use super::record::Record;
use crate::backends::{AuthKey, Backend, BackendId, WriterConfig};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

struct BackendEntry {
    id: BackendId,
    backend: Backend,
}

pub(crate) struct DispatcherShared {
    backends: RwLock<Arc<Vec<Arc<BackendEntry>>>>,
    enricher: RwLock<Enricher>,
    next_id: AtomicUsize,
    closed: AtomicBool,
    metrics: Arc<DispatchMetrics>,
}

impl DispatcherShared {
    /// Enrich on the caller's thread and fan out to every admitting
    /// backend.
    pub(crate) fn emit(&self, level: LogLevel, domain: &str, message: String) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggingError::Shutdown);
        }
        let record = Arc::new(self.enricher.read().enrich(level, domain, message));
        self.fan_out(&record);
        Ok(())
    }

    fn fan_out(&self, record: &Arc<Record>) {
        let snapshot = Arc::clone(&*self.backends.read());
        for entry in snapshot.iter() {
            if entry.backend.filter().admits(record.level) {
                entry.backend.enqueue(record, &self.metrics);
            }
        }
        self.metrics.record_dispatched();
    }
}

/// Re-injection path handed to server backends: received frames re-enter
/// the dispatcher as if locally emitted. Holds a `Weak` reference so a
/// registered server never keeps its own dispatcher alive.
#[derive(Clone)]
pub(crate) struct RecordInjector {
    shared: Weak<DispatcherShared>,
}

impl RecordInjector {
    pub(crate) fn inject(&self, level: LogLevel, domain: &str, message: String) {
        if let Some(shared) = self.shared.upgrade() {
            // A closed dispatcher silently discards late arrivals.
            let _ = shared.emit(level, domain, message);
        }
    }
}

/// Fan-out router owning the backend set of one `Logging` instance.
pub struct Dispatcher {
    shared: Arc<DispatcherShared>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(DispatcherShared {
                backends: RwLock::new(Arc::new(Vec::new())),
                enricher: RwLock::new(Enricher::new()),
                next_id: AtomicUsize::new(1),
                closed: AtomicBool::new(false),
                metrics: Arc::new(DispatchMetrics::new()),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<DispatcherShared> {
        &self.shared
    }

    pub(crate) fn injector(&self) -> RecordInjector {
        RecordInjector {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Construct and register a new backend; the next emit sees it. Past
    /// records are not replayed.
    pub fn add_writer(&self, config: WriterConfig) -> Result<BackendId> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(LoggingError::Shutdown);
        }
        let backend = Backend::build(config, self.injector(), Arc::clone(&self.shared.metrics))?;
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);

        let mut registry = self.shared.backends.write();
        let mut backends = registry.as_ref().clone();
        backends.push(Arc::new(BackendEntry { id, backend }));
        *registry = Arc::new(backends);
        Ok(id)
    }

    /// Unregister a backend, then flush and close it; records it already
    /// accepted are delivered before the close.
    pub fn remove_writer(&self, id: BackendId) -> Result<()> {
        let removed = {
            let mut registry = self.shared.backends.write();
            let mut backends = registry.as_ref().clone();
            let position = backends.iter().position(|entry| entry.id == id);
            match position {
                Some(index) => {
                    let entry = backends.remove(index);
                    *registry = Arc::new(backends);
                    entry
                }
                None => {
                    return Err(LoggingError::config(
                        "Dispatcher",
                        format!("writer {id} does not exist"),
                    ))
                }
            }
        };
        removed.backend.shutdown()
    }

    /// Runtime level change for one backend.
    pub fn set_writer_level(&self, id: BackendId, level: LogLevel) -> Result<()> {
        let snapshot = Arc::clone(&*self.shared.backends.read());
        match snapshot.iter().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.backend.filter().set(level);
                Ok(())
            }
            None => Err(LoggingError::config(
                "Dispatcher",
                format!("writer {id} does not exist"),
            )),
        }
    }

    pub fn set_ext_config(&self, config: &ExtConfig) {
        *self.shared.enricher.write() = Enricher::from_ext_config(config);
    }

    /// Block until every backend has durably written everything enqueued
    /// before this call, or until the timeout elapses. Returns whether full
    /// synchronization was achieved.
    pub fn sync(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let snapshot = Arc::clone(&*self.shared.backends.read());
        let mut complete = true;
        for entry in snapshot.iter() {
            complete &= entry.backend.sync(deadline);
        }
        complete
    }

    /// Force a rotation on every file backend.
    pub fn rotate(&self) -> Result<()> {
        let snapshot = Arc::clone(&*self.shared.backends.read());
        for entry in snapshot.iter() {
            entry.backend.rotate()?;
        }
        Ok(())
    }

    /// Drain and close every backend. Idempotent; emits afterwards fail
    /// with [`LoggingError::Shutdown`].
    pub fn shutdown(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let backends = {
            let mut registry = self.shared.backends.write();
            std::mem::replace(&mut *registry, Arc::new(Vec::new()))
        };
        let mut first_error = None;
        for entry in backends.iter() {
            if let Err(e) = entry.backend.shutdown() {
                eprintln!(
                    "[LOGGER ERROR] Failed to stop {} backend: {}",
                    entry.backend.name(),
                    e
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Close the dispatcher without joining workers. Used by the bounded
    /// drop path when a backend is wedged; the abandoned workers die with
    /// the process.
    pub(crate) fn abandon(&self) {
        self.shared.closed.store(true, Ordering::Release);
        let mut registry = self.shared.backends.write();
        *registry = Arc::new(Vec::new());
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.shared.metrics)
    }

    /// Bound addresses of all registered server backends.
    pub fn server_addresses(&self) -> Vec<(BackendId, SocketAddr)> {
        let snapshot = Arc::clone(&*self.shared.backends.read());
        snapshot
            .iter()
            .filter_map(|entry| entry.backend.as_server().map(|s| (entry.id, s.address())))
            .collect()
    }

    /// Auth key of the server backend with the given id, for out-of-band
    /// distribution to clients.
    pub fn server_auth_key(&self, id: BackendId) -> Result<AuthKey> {
        let snapshot = Arc::clone(&*self.shared.backends.read());
        snapshot
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.backend.as_server())
            .map(|server| server.auth_key())
            .ok_or_else(|| {
                LoggingError::config("Dispatcher", format!("writer {id} is not a server"))
            })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
