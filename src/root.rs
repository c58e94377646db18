//! Process-wide default logging instance
//!
//! An explicitly managed singleton: constructed lazily on first use with a
//! plain console writer, replaceable via [`init`], and torn down explicitly
//! via [`shutdown`]. After a teardown the next call constructs a fresh
//! default instance again. A forked child must not keep using the inherited
//! instance (its worker threads do not survive the fork); construct its own
//! `Logging` instead.

use crate::backends::{AuthKey, BackendId, ConsoleWriterConfig, WriterConfig};
use crate::core::error::Result;
use crate::core::ext_config::ExtConfig;
use crate::core::level::LogLevel;
use crate::core::logger::Logger;
use crate::core::logging::Logging;
use crate::core::metrics::DispatchMetrics;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

static ROOT: Lazy<Mutex<Option<Logging>>> = Lazy::new(|| Mutex::new(None));

fn default_instance() -> Logging {
    Logging::new(
        LogLevel::Trace,
        "root",
        vec![WriterConfig::Console(ConsoleWriterConfig::new(
            LogLevel::Trace,
            false,
        ))],
    )
    .expect("console-only default logging cannot fail to construct")
}

fn with_root<T>(f: impl FnOnce(&Logging) -> T) -> T {
    let mut guard = ROOT.lock();
    let instance = guard.get_or_insert_with(default_instance);
    f(instance)
}

/// Install a configured process-wide instance, replacing (and shutting
/// down) the current one if any.
pub fn init(level: LogLevel, configs: Vec<WriterConfig>) -> Result<()> {
    let replacement = Logging::new(level, "root", configs)?;
    let mut guard = ROOT.lock();
    if let Some(previous) = guard.take() {
        previous.shutdown()?;
    }
    *guard = Some(replacement);
    Ok(())
}

/// Tear down the process-wide instance, draining every backend.
pub fn shutdown() -> Result<()> {
    let instance = ROOT.lock().take();
    match instance {
        Some(instance) => instance.shutdown(),
        None => Ok(()),
    }
}

pub fn set_level(level: LogLevel) {
    with_root(|logging| logging.set_level(level))
}

pub fn set_domain(domain: impl Into<String>) {
    let mut guard = ROOT.lock();
    let instance = guard.get_or_insert_with(default_instance);
    instance.set_domain(domain);
}

pub fn set_ext_config(config: &ExtConfig) {
    with_root(|logging| logging.set_ext_config(config))
}

pub fn add_writer(config: impl Into<WriterConfig>) -> Result<BackendId> {
    with_root(|logging| logging.add_writer(config))
}

pub fn remove_writer(id: BackendId) -> Result<()> {
    with_root(|logging| logging.remove_writer(id))
}

pub fn add_logger(domain: impl Into<String>, level: LogLevel) -> Logger {
    with_root(|logging| logging.add_logger(domain, level))
}

pub fn sync(timeout: Duration) -> bool {
    with_root(|logging| logging.sync(timeout))
}

pub fn rotate() -> Result<()> {
    with_root(|logging| logging.rotate())
}

pub fn metrics() -> Arc<DispatchMetrics> {
    with_root(|logging| logging.metrics())
}

pub fn server_addresses() -> Vec<(BackendId, SocketAddr)> {
    with_root(|logging| logging.server_addresses())
}

pub fn server_auth_key(id: BackendId) -> Result<AuthKey> {
    with_root(|logging| logging.server_auth_key(id))
}

// Emit calls

pub fn log(level: LogLevel, message: impl Into<String>) -> Result<()> {
    with_root(|logging| logging.log(level, message))
}

pub fn trace(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Trace, message)
}

pub fn debug(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Debug, message)
}

pub fn info(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Info, message)
}

pub fn success(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Success, message)
}

pub fn warning(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Warning, message)
}

pub fn error(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Error, message)
}

pub fn critical(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Critical, message)
}

/// Alias of [`critical`].
pub fn fatal(message: impl Into<String>) -> Result<()> {
    log(LogLevel::Critical, message)
}
