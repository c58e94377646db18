//! Logging facade owning one dispatcher and its backends

use super::dispatcher::Dispatcher;
use super::error::Result;
use super::ext_config::ExtConfig;
use super::level::{LevelFilter, LogLevel};
use super::logger::Logger;
use super::metrics::DispatchMetrics;
use crate::backends::{AuthKey, BackendId, WriterConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Timeout used for the best-effort shutdown when a `Logging` instance is
/// dropped without an explicit `shutdown()` call.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owner of one dispatcher and its writer backends.
///
/// All methods take `&self`; a `Logging` instance may be shared across
/// threads behind an `Arc`. After a process fork, construct a fresh
/// instance in the child instead of using the inherited one, otherwise the
/// parent and child interleave writes on the same file handles.
pub struct Logging {
    filter: LevelFilter,
    domain: String,
    dispatcher: Dispatcher,
}

impl Logging {
    /// Create an instance with the given instance-wide level, domain, and
    /// initial writer set. Construction fails if any writer config is
    /// invalid.
    pub fn new(
        level: LogLevel,
        domain: impl Into<String>,
        configs: Vec<WriterConfig>,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::new();
        for config in configs {
            dispatcher.add_writer(config)?;
        }
        Ok(Self {
            filter: LevelFilter::new(level),
            domain: domain.into(),
            dispatcher,
        })
    }

    #[must_use]
    pub fn builder() -> LoggingBuilder {
        LoggingBuilder::new()
    }

    // Management

    pub fn add_writer(&self, config: impl Into<WriterConfig>) -> Result<BackendId> {
        self.dispatcher.add_writer(config.into())
    }

    pub fn remove_writer(&self, id: BackendId) -> Result<()> {
        self.dispatcher.remove_writer(id)
    }

    pub fn set_level(&self, level: LogLevel) {
        self.filter.set(level);
    }

    pub fn level(&self) -> LogLevel {
        self.filter.get()
    }

    pub fn set_writer_level(&self, id: BackendId, level: LogLevel) -> Result<()> {
        self.dispatcher.set_writer_level(id, level)
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Apply enrichment toggles; affects every record produced afterwards.
    pub fn set_ext_config(&self, config: &ExtConfig) {
        self.dispatcher.set_ext_config(config);
    }

    /// Create a handle that shares this instance's backends but carries
    /// its own domain and level filter.
    pub fn add_logger(&self, domain: impl Into<String>, level: LogLevel) -> Logger {
        Logger::new(
            level,
            domain,
            Arc::downgrade(self.dispatcher.shared()),
        )
    }

    /// Durability barrier across all backends; `true` iff every backend
    /// confirmed within the timeout.
    pub fn sync(&self, timeout: Duration) -> bool {
        self.dispatcher.sync(timeout)
    }

    /// Force a rotation on every file backend.
    pub fn rotate(&self) -> Result<()> {
        self.dispatcher.rotate()
    }

    /// Flush and close every backend. Idempotent; later emits fail with a
    /// `Shutdown` error.
    pub fn shutdown(&self) -> Result<()> {
        self.dispatcher.shutdown()
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.dispatcher.metrics()
    }

    // Server introspection, for out-of-band distribution to clients

    pub fn server_addresses(&self) -> Vec<(BackendId, SocketAddr)> {
        self.dispatcher.server_addresses()
    }

    pub fn server_auth_key(&self, id: BackendId) -> Result<AuthKey> {
        self.dispatcher.server_auth_key(id)
    }

    // Emit calls

    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        if !self.filter.admits(level) {
            return Ok(());
        }
        self.dispatcher
            .shared()
            .emit(level, &self.domain, message.into())
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    pub fn critical(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Critical, message)
    }

    /// Alias of [`critical`](Self::critical).
    pub fn fatal(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Critical, message)
    }
}

impl Drop for Logging {
    fn drop(&mut self) {
        if self.dispatcher.is_closed() {
            return;
        }
        // Bound the implicit teardown so dropping a wedged instance cannot
        // hang the process; explicit shutdown() drains completely.
        if self.dispatcher.sync(DEFAULT_SHUTDOWN_TIMEOUT) {
            if let Err(e) = self.dispatcher.shutdown() {
                eprintln!("[LOGGER ERROR] Failed to shut down logging on drop: {}", e);
            }
        } else {
            eprintln!(
                "[LOGGER WARNING] Logging dropped before all backends drained. \
                 Some records may be lost."
            );
            self.dispatcher.abandon();
        }
    }
}

/// Builder for constructing `Logging` with a fluent API
///
/// # Example
/// ```
/// use multilog_system::prelude::*;
///
/// let logging = Logging::builder()
///     .level(LogLevel::Debug)
///     .domain("app")
///     .writer(ConsoleWriterConfig::new(LogLevel::Debug, true))
///     .build()
///     .unwrap();
/// logging.info("ready").unwrap();
/// logging.shutdown().unwrap();
/// ```
pub struct LoggingBuilder {
    level: LogLevel,
    domain: String,
    configs: Vec<WriterConfig>,
    ext_config: Option<ExtConfig>,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            domain: "root".to_string(),
            configs: Vec::new(),
            ext_config: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn writer(mut self, config: impl Into<WriterConfig>) -> Self {
        self.configs.push(config.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn ext_config(mut self, config: ExtConfig) -> Self {
        self.ext_config = Some(config);
        self
    }

    pub fn build(self) -> Result<Logging> {
        let logging = Logging::new(self.level, self.domain, self.configs)?;
        if let Some(ref ext_config) = self.ext_config {
            logging.set_ext_config(ext_config);
        }
        Ok(logging)
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
