//! Error types for the logging engine

pub type Result<T> = std::result::Result<T, LoggingError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration, surfaced synchronously at construction or
    /// `add_writer` time
    #[error("Invalid configuration for {component}: {message}")]
    Config { component: String, message: String },

    /// Per-backend write fault; other backends are unaffected
    #[error("Write error in {backend} backend: {message}")]
    Write { backend: String, message: String },

    /// Log file rotation failure
    #[error("Rotation failed for '{path}': {message}")]
    Rotation { path: String, message: String },

    /// Authentication key mismatch on a network connection
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Operation attempted after `shutdown()`
    #[error("Logging dispatcher is shut down")]
    Shutdown,

    /// Failed to hand a command to a backend worker
    #[error("Failed to send {command} to {backend} backend: {message}")]
    SendCmd {
        backend: String,
        command: String,
        message: String,
    },

    /// Backend worker did not acknowledge a command in time
    #[error("No {command} acknowledgment from {backend} backend: {message}")]
    RecvAck {
        backend: String,
        command: String,
        message: String,
    },

    /// Backend worker thread could not be joined
    #[error("Failed to join {backend} worker: {message}")]
    Join { backend: String, message: String },
}

impl LoggingError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggingError::Config {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a per-backend write error
    pub fn write(backend: impl Into<String>, message: impl Into<String>) -> Self {
        LoggingError::Write {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a rotation error
    pub fn rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggingError::Rotation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn send_cmd(
        backend: impl Into<String>,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoggingError::SendCmd {
            backend: backend.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn recv_ack(
        backend: impl Into<String>,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoggingError::RecvAck {
            backend: backend.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn join(backend: impl Into<String>, message: impl Into<String>) -> Self {
        LoggingError::Join {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
