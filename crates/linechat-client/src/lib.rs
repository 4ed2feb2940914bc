//! Linechat client.
//!
//! # Architecture
//!
//! [`ChatClient`] is the pure session handler and command interpreter.
//! [`ClientRuntime`] executes its actions against any
//! [`ClientTransport`](linechat_core::ClientTransport), and [`Client`] wires
//! that runtime to TCP and a console line source.
//!
//! # Components
//!
//! - [`ChatClient`]: Login on connect, command handling (pure logic, no I/O)
//! - [`ClientRuntime`]: Generic action executor
//! - [`TcpClientTransport`]: Tokio TCP transport

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod runtime;
mod transport;

pub use client::{
    ChatClient, ClientAction, ClientConfig, ClientEvent, ConnectOrigin, ConnectionState, Exit,
    SendKind,
};
pub use error::ClientError;
use linechat_core::{ChatDisplay, StdoutDisplay};
pub use runtime::ClientRuntime;
use tokio::sync::mpsc;
pub use transport::{TcpClientTransport, TransportEvent};

/// TCP chat client.
pub struct Client<D = StdoutDisplay> {
    runtime: ClientRuntime<TcpClientTransport, D>,
    events: mpsc::Receiver<TransportEvent>,
}

impl Client<StdoutDisplay> {
    /// Create a client that shows output on stdout.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_display(config, StdoutDisplay)
    }
}

impl<D: ChatDisplay> Client<D> {
    /// Create a client with a custom display. Not yet connected.
    pub fn with_display(config: ClientConfig, display: D) -> Self {
        let (transport, events) = TcpClientTransport::new();
        Self { runtime: ClientRuntime::new(ChatClient::new(config), transport, display), events }
    }

    /// Connect, then process console input and server traffic until the
    /// client terminates or the console closes.
    pub async fn run(self, mut console: mpsc::Receiver<String>) -> Result<Exit, ClientError> {
        let Self { mut runtime, mut events } = self;

        if let Some(exit) = runtime.start().await {
            return Ok(exit);
        }

        loop {
            let exit = tokio::select! {
                line = console.recv() => match line {
                    Some(line) => runtime.dispatch(ClientEvent::Input(line)).await,
                    None => {
                        tracing::info!("Console closed");
                        runtime.shutdown().await;
                        Some(Exit::Success)
                    },
                },
                event = events.recv() => match event {
                    Some(event) => match runtime.transport_mut().acknowledge(event) {
                        Some(event) => runtime.dispatch(event).await,
                        None => None,
                    },
                    None => return Err(ClientError::Internal("transport event channel closed".into())),
                },
            };

            if let Some(exit) = exit {
                return Ok(exit);
            }
        }
    }
}
