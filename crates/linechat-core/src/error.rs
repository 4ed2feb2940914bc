//! Error types shared by the server and client crates.

use thiserror::Error;

use crate::transport::ConnectionId;

/// Failures reported by a [`ServerTransport`](crate::ServerTransport) or
/// [`ClientTransport`](crate::ClientTransport).
///
/// Errors carry rendered messages rather than `io::Error` so that they can
/// be cloned into events and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No connection is open.
    #[error("not connected")]
    NotConnected,

    /// A connection is already open.
    #[error("already connected")]
    AlreadyConnected,

    /// The connection id is not (or no longer) known to the transport.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// Opening a connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Writing a line failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Binding the listening socket failed.
    #[error("listen failed: {0}")]
    Listen(String),

    /// Other I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Malformed console command arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A required positional argument was not given.
    #[error("{command}: missing argument {index}")]
    MissingArgument {
        /// Command name including `#`
        command: String,
        /// Zero-based argument position
        index: usize,
    },

    /// A port argument was not a number in `0..=65535`.
    #[error("{command}: invalid port '{value}'")]
    InvalidPort {
        /// Command name including `#`
        command: String,
        /// Offending argument text
        value: String,
    },
}
