//! Linechat server.
//!
//! # Architecture
//!
//! The protocol logic is pure: [`ServerDriver`] turns transport events into
//! [`ServerAction`]s and [`ServerConsole`] turns operator input into
//! [`ConsoleAction`]s. [`ServerRuntime`] executes both against any
//! [`ServerTransport`](linechat_core::ServerTransport), and [`Server`] wires
//! that runtime to TCP and a console line source.
//!
//! Every event (network or console) is handled on one task, so registry
//! updates and broadcasts never interleave.
//!
//! # Components
//!
//! - [`ConnectionRegistry`]: Session identity and liveness per connection
//! - [`ServerDriver`]: Login handshake and routing (pure logic, no I/O)
//! - [`ServerConsole`]: Operator command interpreter
//! - [`ServerRuntime`]: Generic action executor
//! - [`TcpServerTransport`]: Tokio TCP transport

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod console;
mod driver;
mod error;
mod registry;
mod runtime;
mod transport;

use std::net::SocketAddr;

pub use console::{ConsoleAction, ServerConsole};
pub use driver::{LogLevel, ServerAction, ServerDriver, ServerEvent};
pub use error::ServerError;
use linechat_core::{ChatDisplay, DEFAULT_PORT, StdoutDisplay, TransportError};
pub use registry::{ConnectionRegistry, LoginOutcome, SessionInfo, SessionState};
pub use runtime::{Flow, ServerRuntime};
use tokio::sync::mpsc;
pub use transport::{MAX_LINE_LENGTH, NetEvent, OUTBOUND_QUEUE, TcpServerTransport};

/// Server configuration for the TCP runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Host to bind to (e.g., "0.0.0.0")
    pub bind_host: String,
    /// Initial listen port
    pub port: u16,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_host: "0.0.0.0".to_string(), port: DEFAULT_PORT }
    }
}

/// TCP chat server.
pub struct Server<D = StdoutDisplay> {
    runtime: ServerRuntime<TcpServerTransport, D>,
    events: mpsc::Receiver<NetEvent>,
}

impl Server<StdoutDisplay> {
    /// Create a server that shows operator output on stdout.
    pub fn new(config: ServerRuntimeConfig) -> Self {
        Self::with_display(config, StdoutDisplay)
    }
}

impl<D: ChatDisplay> Server<D> {
    /// Create a server with a custom operator display. Not yet listening.
    pub fn with_display(config: ServerRuntimeConfig, display: D) -> Self {
        let (transport, events) = TcpServerTransport::new(config.bind_host);
        Self { runtime: ServerRuntime::new(config.port, transport, display), events }
    }

    /// Create a server and start listening.
    pub async fn bind(config: ServerRuntimeConfig, display: D) -> Result<Self, ServerError> {
        let mut server = Self::with_display(config, display);
        server.start().await.map_err(ServerError::Listen)?;
        Ok(server)
    }

    /// Start listening on the configured port.
    ///
    /// A failure is reported on the operator display; the server can still
    /// be started later with `#start`.
    pub async fn start(&mut self) -> Result<(), TransportError> {
        self.runtime.start().await
    }

    /// Address of the listening socket, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.runtime.transport().local_addr()
    }

    /// Serve clients and operator input until `#quit`.
    ///
    /// When the console closes the server keeps serving clients.
    pub async fn run(self, mut console: mpsc::Receiver<String>) -> Result<(), ServerError> {
        let Self { mut runtime, mut events } = self;
        let mut console_open = true;

        loop {
            tokio::select! {
                line = console.recv(), if console_open => match line {
                    Some(line) => {
                        if runtime.handle_console(&line).await == Flow::Shutdown {
                            break;
                        }
                    },
                    None => {
                        tracing::info!("Console closed, serving clients only");
                        console_open = false;
                    },
                },
                event = events.recv() => match event {
                    Some(event) => {
                        if let Some(event) = runtime.transport_mut().translate(event) {
                            runtime.dispatch(event).await;
                        }
                    },
                    None => {
                        return Err(ServerError::Internal("network event channel closed".into()));
                    },
                },
            }
        }

        runtime.shutdown().await;
        Ok(())
    }
}
