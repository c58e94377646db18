//! Lightweight per-component logger handle

use super::dispatcher::DispatcherShared;
use super::error::{LoggingError, Result};
use super::level::{LevelFilter, LogLevel};
use std::sync::Weak;

/// A non-owning emit handle bound to one dispatcher.
///
/// Created via `Logging::add_logger`; carries its own domain and level
/// filter, shares the owning instance's backends, and may be created and
/// dropped freely without affecting backend lifetime. Emitting after the
/// owning `Logging` was shut down or dropped returns
/// [`LoggingError::Shutdown`].
pub struct Logger {
    filter: LevelFilter,
    domain: String,
    shared: Weak<DispatcherShared>,
}

impl Logger {
    pub(crate) fn new(
        level: LogLevel,
        domain: impl Into<String>,
        shared: Weak<DispatcherShared>,
    ) -> Self {
        Self {
            filter: LevelFilter::new(level),
            domain: domain.into(),
            shared,
        }
    }

    pub fn set_level(&self, level: LogLevel) {
        self.filter.set(level);
    }

    pub fn level(&self) -> LogLevel {
        self.filter.get()
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        if !self.filter.admits(level) {
            return Ok(());
        }
        match self.shared.upgrade() {
            Some(shared) => shared.emit(level, &self.domain, message.into()),
            None => Err(LoggingError::Shutdown),
        }
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
