//! Client error types.

use thiserror::Error;

/// Errors that stop the client before or outside the chat session.
///
/// Failures inside the session (send errors, connection loss) are shown to
/// the user and end the session through [`Exit`](crate::Exit) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No login id on the command line.
    #[error("ERROR - No login ID specified. Connection aborted.")]
    MissingLoginId,

    /// The transport's event channel closed unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),
}
