//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. They work with
//! anything exposing the emit surface: a `Logging` instance or a `Logger`
//! handle.
//!
//! # Examples
//!
//! ```
//! use multilog_system::prelude::*;
//! use multilog_system::info;
//!
//! let logging = Logging::new(LogLevel::Trace, "root", vec![]).unwrap();
//!
//! info!(logging, "Server started").unwrap();
//!
//! let port = 8080;
//! info!(logging, "Server listening on port {}", port).unwrap();
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use multilog_system::prelude::*;
/// # let logging = Logging::new(LogLevel::Trace, "root", vec![]).unwrap();
/// use multilog_system::log;
/// log!(logging, LogLevel::Info, "Simple message").unwrap();
/// log!(logging, LogLevel::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logging:expr, $level:expr, $($arg:tt)+) => {
        $logging.log($level, format!($($arg)+))
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a success-level message.
#[macro_export]
macro_rules! success {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Success, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warning {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log a fatal-level message (alias of critical).
#[macro_export]
macro_rules! fatal {
    ($logging:expr, $($arg:tt)+) => {
        $crate::log!($logging, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, Logging};

    fn logging() -> Logging {
        Logging::new(LogLevel::Trace, "root", vec![]).unwrap()
    }

    #[test]
    fn test_log_macro() {
        let logging = logging();
        log!(logging, LogLevel::Info, "Test message").unwrap();
        log!(logging, LogLevel::Info, "Formatted: {}", 42).unwrap();
    }

    #[test]
    fn test_level_macros() {
        let logging = logging();
        trace!(logging, "Trace message").unwrap();
        debug!(logging, "Count: {}", 5).unwrap();
        info!(logging, "Items: {}", 100).unwrap();
        success!(logging, "Deployed {}", "v2").unwrap();
        warning!(logging, "Retry {} of {}", 1, 3).unwrap();
        error!(logging, "Code: {}", 500).unwrap();
        critical!(logging, "Out of disk").unwrap();
        fatal!(logging, "Unrecoverable: {}", "corrupt state").unwrap();
    }

    #[test]
    fn test_macro_on_logger_handle() {
        let logging = logging();
        let logger = logging.add_logger("child", LogLevel::Trace);
        info!(logger, "via handle").unwrap();
    }
}
