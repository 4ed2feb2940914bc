//! Server error types.

use std::fmt;

use linechat_core::TransportError;

/// Errors that end the server runtime.
#[derive(Debug)]
pub enum ServerError {
    /// The initial listen failed.
    ///
    /// Returned by [`Server::bind`](crate::Server::bind). Later listen
    /// failures (from `#start`) are reported on the console instead.
    Listen(TransportError),

    /// The transport's event channel closed unexpectedly.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listen(err) => write!(f, "could not listen for clients: {err}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Listen(err) => Some(err),
            Self::Internal(_) => None,
        }
    }
}

