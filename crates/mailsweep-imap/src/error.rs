//! Error types for the IMAP client.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response could not be parsed.
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte offset into the response line.
        position: usize,
        /// What the parser expected.
        message: String,
    },

    /// Server rejected the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server returned NO.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE and is closing the connection.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A command did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Command issued in a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The connection is gone and could not be re-established.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true for network-level faults that may succeed on retry.
    ///
    /// Server status replies (NO, BAD) and parse failures are never
    /// transient: sending the same command again yields the same answer.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout(_) | Self::ConnectionLost(_) | Self::Bye(_)
        )
    }

    /// Returns true if the connection can no longer be used after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::Timeout(_)
                | Self::ConnectionLost(_)
                | Self::Bye(_)
                | Self::Protocol(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
