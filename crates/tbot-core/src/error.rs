use thiserror::Error;

/// Top-level error type for tbot.
#[derive(Debug, Error)]
pub enum TbotError {
    /// Error talking to the messaging transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// Persistence/storage error.
    #[error("store error: {0}")]
    Store(String),

    /// Error from a command handler or its upstream API.
    #[error("command error: {0}")]
    Command(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
