//! Error types for the shell core.

use crate::host::contract::ContractError;

/// Top-level error type for the front end and its host bridge.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Bridge setup or handshake error (missing host handle, double registration).
    #[error("bridge error: {0}")]
    Bridge(String),

    /// Channel send/receive error, including a host process that went away.
    #[error("channel error: {0}")]
    Channel(String),

    /// Envelope failed contract validation.
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// The host rejected an outbound call.
    #[error("host error: {0}")]
    Host(String),

    /// Attachment could not be read or encoded.
    #[error("attachment error: {0}")]
    Attachment(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ShellError>;
