//! Network server backend
//!
//! Accepts authenticated connections and re-injects received frames into
//! the local dispatcher as if they had been emitted locally. This backend
//! is ingress-only: locally emitted records are never routed to it.

use super::wire::{check_handshake, read_frame, AuthKey};
use crate::core::dispatcher::RecordInjector;
use crate::core::error::{LoggingError, Result};
use crate::core::level::{LevelFilter, LogLevel};
use parking_lot::Mutex;
use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub level: LogLevel,
    pub bind_address: String,
    /// Preset key; a fresh one is generated when absent.
    pub key: Option<AuthKey>,
}

impl ServerConfig {
    pub fn new(level: LogLevel, bind_address: impl Into<String>) -> Self {
        Self {
            level,
            bind_address: bind_address.into(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: AuthKey) -> Self {
        self.key = Some(key);
        self
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn handle_connection(
    stream: TcpStream,
    key: AuthKey,
    filter: Arc<LevelFilter>,
    injector: RecordInjector,
    stop: Arc<AtomicBool>,
) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    let mut stream = stream;
    if stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .is_err()
    {
        return;
    }

    // Mismatched keys drop the connection before any record is read.
    if let Err(err) = check_handshake(&mut stream, &key) {
        if matches!(err, LoggingError::Auth(_)) {
            eprintln!("[LOGGER WARNING] LoggingServer rejected client {peer}: {err}");
        }
        return;
    }

    // Short timeout while streaming so the stop flag is observed.
    let _ = stream.set_read_timeout(Some(Duration::from_millis(500)));
    let mut reader = BufReader::new(stream);
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match read_frame(&mut reader) {
            Ok(record) => {
                if filter.admits(record.level) {
                    injector.inject(record.level, &record.domain, record.message);
                }
            }
            Err(ref e) if is_timeout(e) => continue,
            Err(_) => break,
        }
    }
}

fn server_thread(
    listener: TcpListener,
    key: AuthKey,
    filter: Arc<LevelFilter>,
    injector: RecordInjector,
    stop: Arc<AtomicBool>,
) {
    let mut handlers: Vec<JoinHandle<()>> = Vec::new();
    for stream in listener.incoming() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[LOGGER ERROR] LoggingServer accept failed: {}", e);
                continue;
            }
        };
        let key = key.clone();
        let filter = Arc::clone(&filter);
        let injector = injector.clone();
        let stop = Arc::clone(&stop);
        match thread::Builder::new()
            .name("LoggingServerClient".to_string())
            .spawn(move || handle_connection(stream, key, filter, injector, stop))
        {
            Ok(handle) => handlers.push(handle),
            Err(e) => eprintln!("[LOGGER ERROR] LoggingServer handler spawn failed: {}", e),
        }
        handlers.retain(|h| !h.is_finished());
    }
    for handle in handlers {
        let _ = handle.join();
    }
}

pub struct ServerBackend {
    filter: Arc<LevelFilter>,
    address: SocketAddr,
    auth_key: AuthKey,
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ServerBackend {
    pub(crate) fn new(config: ServerConfig, injector: RecordInjector) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_address).map_err(|e| {
            LoggingError::config(
                "LoggingServer",
                format!("cannot bind '{}': {}", config.bind_address, e),
            )
        })?;
        let address = listener.local_addr()?;
        let auth_key = config.key.unwrap_or_else(AuthKey::generate);
        let filter = Arc::new(LevelFilter::new(config.level));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let key = auth_key.clone();
            let filter = Arc::clone(&filter);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("LoggingServer".to_string())
                .spawn(move || server_thread(listener, key, filter, injector, stop))?
        };

        Ok(Self {
            filter,
            address,
            auth_key,
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn filter(&self) -> &LevelFilter {
        &self.filter
    }

    /// The actually bound address; differs from the configured one when a
    /// port of 0 was requested.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn auth_key(&self) -> AuthKey {
        self.auth_key.clone()
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            self.stop.store(true, Ordering::Relaxed);
            // Poke the listener so the blocking accept wakes up.
            let _ = TcpStream::connect(self.address);
            handle
                .join()
                .map_err(|_| LoggingError::join("LoggingServer", "accept thread panicked"))?;
        }
        Ok(())
    }
}
