//! # Multilog System
//!
//! A production-ready, high-performance multi-backend logging engine with
//! asynchronous dispatch, rotating files, and authenticated network log
//! shipping.
//!
//! ## Features
//!
//! - **Non-blocking dispatch**: producers enqueue; every sink drains its
//!   own bounded queue on a dedicated worker
//! - **Multiple backends**: console, rotating/compressing file, callback,
//!   and authenticated network server/client
//! - **Thread safe**: designed for concurrent producers across threads and
//!   processes
//! - **Deterministic teardown**: bounded `sync`, idempotent `shutdown`

pub mod backends;
pub mod core;
pub mod macros;
pub mod root;

pub mod prelude {
    pub use crate::backends::{
        AuthKey, BackendId, CallbackFn, CallbackWriterConfig, ClientWriterConfig,
        CompressionMethod, ConsoleTarget, ConsoleWriterConfig, FileWriterConfig, ServerConfig,
        WriterConfig,
    };
    pub use crate::core::{
        DispatchMetrics, Dispatcher, ExtConfig, LevelFilter, LevelStyle, LogLevel, Logger, Logging,
        LoggingBuilder, LoggingError, MessageStructure, Record, Result,
        DEFAULT_SHUTDOWN_TIMEOUT, FATAL,
    };
}

pub use backends::{
    AuthKey, BackendId, CallbackFn, CallbackWriterConfig, ClientWriterConfig, CompressionMethod,
    ConsoleTarget, ConsoleWriterConfig, FileWriterConfig, ServerConfig, WriterConfig,
};
pub use core::{
    DispatchMetrics, Dispatcher, ExtConfig, LevelFilter, LevelStyle, LogLevel, Logger, Logging,
    LoggingBuilder, LoggingError, MessageStructure, Record, Result, DEFAULT_SHUTDOWN_TIMEOUT,
    FATAL,
};
