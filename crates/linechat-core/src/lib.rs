//! Linechat protocol core.
//!
//! Pure protocol pieces shared by the server and the client: the line-based
//! wire grammar, the `#`-command parser used by both consoles, and the
//! transport contracts the runtimes implement.
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O. The server and client crates build
//! action-based state machines on top of these types and execute the
//! resulting actions through a [`ServerTransport`] or [`ClientTransport`].
//!
//! # Components
//!
//! - [`wire`]: Login handshake, chat and operator line formats
//! - [`command`]: Console input parsing (`#name arg...` versus free text)
//! - [`transport`]: Transport capability traits and [`ConnectionId`]
//! - [`display`]: Output sinks for user-visible lines

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod display;
pub mod error;
pub mod transport;
pub mod wire;

pub use command::{Command, ConsoleInput};
pub use display::{ChatDisplay, MemoryDisplay, StdoutDisplay};
pub use error::{CommandError, TransportError};
pub use transport::{ClientTransport, ConnectionId, ServerTransport};

/// Port used when none (or an unparseable one) is given.
pub const DEFAULT_PORT: u16 = 5555;

/// Host used by the client when none is given.
pub const DEFAULT_HOST: &str = "localhost";

/// Parse a port argument leniently, falling back to [`DEFAULT_PORT`].
///
/// Used by the command-line entry points, which never reject a bad port.
pub fn port_or_default(arg: Option<&str>) -> u16 {
    arg.and_then(|p| p.trim().parse().ok()).unwrap_or(DEFAULT_PORT)
}
