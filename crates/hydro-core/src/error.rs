use thiserror::Error;

/// Top-level error type for Hydro.
#[derive(Debug, Error)]
pub enum HydroError {
    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Reminder could not be rendered or handed to a channel.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
