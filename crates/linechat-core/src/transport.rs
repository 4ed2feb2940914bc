//! Transport capability traits.
//!
//! The runtimes talk to the network only through these traits. The TCP
//! implementations live in the server and client crates, and the simulation
//! harness provides in-memory ones. Incoming traffic does not flow through
//! the traits: each implementation delivers received lines and connection
//! lifecycle changes to its runtime as events.

use std::{fmt, future::Future};

use crate::error::TransportError;

/// Opaque handle naming one accepted client connection on the server.
///
/// Assigned by the server transport, unique for the lifetime of the
/// process and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Server side of the transport.
///
/// Accepting connections and reading lines happen in the background;
/// results are reported to the runtime as events. Existing connections are
/// unaffected by [`stop_listening`](ServerTransport::stop_listening).
pub trait ServerTransport: Send {
    /// Start accepting connections on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Listen`] if the port cannot be bound.
    fn listen(&mut self, port: u16) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Stop accepting new connections.
    fn stop_listening(&mut self) -> impl Future<Output = ()> + Send;

    /// Whether new connections are currently accepted.
    fn is_listening(&self) -> bool;

    /// Write one line to a connection.
    fn send(
        &mut self,
        conn: ConnectionId,
        line: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close a connection. No further events are reported for it.
    fn close(&mut self, conn: ConnectionId)
    -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Client side of the transport. At most one connection is open at a time.
pub trait ClientTransport: Send {
    /// Open a connection to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AlreadyConnected`] if a connection is open,
    /// or [`TransportError::Connection`] if connecting fails.
    fn open(
        &mut self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the open connection. Resolves once the close is confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] if nothing is open.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Write one line to the server.
    fn send(&mut self, line: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Whether a connection is open.
    fn is_connected(&self) -> bool;
}
