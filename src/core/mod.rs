//! Core types, dispatch, and the logging facade

pub mod dispatcher;
pub mod enricher;
pub mod error;
pub mod ext_config;
pub mod level;
pub mod logger;
pub mod logging;
pub mod metrics;
pub mod record;

pub use dispatcher::Dispatcher;
pub use enricher::Enricher;
pub use error::{LoggingError, Result};
pub use ext_config::{ExtConfig, MessageStructure};
pub use level::{LevelFilter, LevelStyle, LogLevel, FATAL};
pub use logger::Logger;
pub use logging::{Logging, LoggingBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::DispatchMetrics;
pub use record::Record;
