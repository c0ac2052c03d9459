//! Error types for the core library.

use thiserror::Error;

use crate::config::ValidationError;

/// Errors that can end a cleanup run or stop it from starting.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailsweep_imap::Error),

    /// No session could be opened for a worker.
    #[error("Could not open an IMAP session: {0}")]
    SessionAcquisition(#[source] mailsweep_imap::Error),

    /// The session pool was shut down while a caller waited on it.
    #[error("Session pool is closed")]
    PoolClosed,

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration failed validation.
    #[error("Invalid configuration: {}", join_messages(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
