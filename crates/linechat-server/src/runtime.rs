//! Generic server runtime.
//!
//! Owns the [`ServerDriver`], the [`ServerConsole`] and a
//! [`ServerTransport`], and executes the actions they produce. The same
//! runtime drives the TCP server and the simulation harness.

use std::collections::VecDeque;

use linechat_core::{ChatDisplay, ConnectionId, ServerTransport, TransportError};

use crate::{
    console::{ConsoleAction, ServerConsole},
    driver::{LogLevel, ServerAction, ServerDriver, ServerEvent},
};

/// Operator report when an announcement misses a recipient.
const SEND_FAILED: &str = "Could not send message.";

/// Whether the runtime should keep going after operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep serving.
    Continue,
    /// The operator asked to quit.
    Shutdown,
}

/// Executes driver and console actions against a transport.
pub struct ServerRuntime<T, D> {
    driver: ServerDriver,
    console: ServerConsole,
    transport: T,
    display: D,
}

impl<T, D> ServerRuntime<T, D>
where
    T: ServerTransport,
    D: ChatDisplay,
{
    /// Create a runtime that will listen on `port` once started.
    pub fn new(port: u16, transport: T, display: D) -> Self {
        Self { driver: ServerDriver::new(), console: ServerConsole::new(port), transport, display }
    }

    /// Start listening on the configured port.
    ///
    /// The outcome is shown on the operator display either way.
    pub async fn start(&mut self) -> Result<(), TransportError> {
        let port = self.console.port();
        self.listen(port).await
    }

    async fn listen(&mut self, port: u16) -> Result<(), TransportError> {
        match self.transport.listen(port).await {
            Ok(()) => {
                tracing::info!("Listening on port {port}");
                self.display.display(&format!("Server listening for connections on port {port}"));
                Ok(())
            },
            Err(e) => {
                tracing::error!("Failed to listen on port {port}: {e}");
                self.display.display("ERROR - Could not listen for clients!");
                Err(e)
            },
        }
    }

    async fn stop_listening(&mut self) {
        self.transport.stop_listening().await;
        tracing::info!("Stopped listening");
        self.display.display("Server has stopped listening for connections.");
    }

    /// Feed one transport event to the driver and execute the result.
    pub async fn dispatch(&mut self, event: ServerEvent) {
        let actions = self.driver.process_event(event);
        self.execute(actions).await;
    }

    /// Interpret one line of operator input.
    pub async fn handle_console(&mut self, line: &str) -> Flow {
        let listening = self.transport.is_listening();
        for action in self.console.handle_input(line, listening) {
            match action {
                ConsoleAction::Quit => return Flow::Shutdown,
                ConsoleAction::StopListening => self.stop_listening().await,
                ConsoleAction::Close => {
                    if self.transport.is_listening() {
                        self.stop_listening().await;
                    }
                    let actions = self.driver.close_all("server closed");
                    self.execute(actions).await;
                },
                ConsoleAction::StartListening { port } => {
                    // Failure is already on the operator display
                    if self.listen(port).await.is_err() {
                        tracing::debug!("#start failed, still stopped");
                    }
                },
                ConsoleAction::Display(line) => self.display.display(&line),
                ConsoleAction::Announce(text) => {
                    let actions = self.driver.announce(&text);
                    if self.execute(actions).await > 0 {
                        self.display.display(SEND_FAILED);
                    }
                },
            }
        }
        Flow::Continue
    }

    /// Stop listening and drop every connection without further reports.
    pub async fn shutdown(&mut self) {
        if self.transport.is_listening() {
            self.transport.stop_listening().await;
        }
        for conn in self.driver.registry().connections() {
            if let Err(e) = self.transport.close(conn).await {
                tracing::debug!("Ignoring close error for {conn}: {e}");
            }
        }
        tracing::info!("Server shut down");
    }

    /// Execute `actions` in order, returning how many sends failed.
    async fn execute(&mut self, actions: Vec<ServerAction>) -> usize {
        let mut queue = VecDeque::from(actions);
        let mut failed = 0;

        while let Some(action) = queue.pop_front() {
            match action {
                ServerAction::SendTo { conn, line } => {
                    if let Err(e) = self.transport.send(conn, &line).await {
                        failed += 1;
                        queue.extend(self.delivery_failed(conn, &e));
                    }
                },
                ServerAction::Broadcast { recipients, line } => {
                    for conn in recipients {
                        if let Err(e) = self.transport.send(conn, &line).await {
                            failed += 1;
                            queue.extend(self.delivery_failed(conn, &e));
                        }
                    }
                },
                ServerAction::Close { conn, reason } => {
                    tracing::info!("Closing {conn}: {reason}");
                    if let Err(e) = self.transport.close(conn).await {
                        tracing::warn!("Error closing {conn}: {e}");
                    }
                    // The transport reports nothing for connections it closed
                    queue.extend(self.driver.on_client_disconnected(conn));
                },
                ServerAction::Display(line) => self.display.display(&line),
                ServerAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{message}"),
                    LogLevel::Info => tracing::info!("{message}"),
                    LogLevel::Warn => tracing::warn!("{message}"),
                },
            }
        }
        failed
    }

    /// A failed delivery marks the connection not alive; the disconnect
    /// path reaps it later.
    fn delivery_failed(&mut self, conn: ConnectionId, error: &TransportError) -> Vec<ServerAction> {
        tracing::warn!("Delivery to {conn} failed: {error}");
        self.driver.on_liveness_changed(conn, false)
    }

    /// Server driver (for inspection).
    pub fn driver(&self) -> &ServerDriver {
        &self.driver
    }

    /// Operator console state.
    pub fn console(&self) -> &ServerConsole {
        &self.console
    }

    /// Transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
