//! A whole chat system in one process.
//!
//! `SimWorld` runs the real [`ServerRuntime`] and one [`ClientRuntime`] per
//! named client over a [`SimNetwork`]. Tests drive it explicitly: each
//! input call executes immediately and then [`settle`](SimWorld::settle)s
//! the network, so assertions always see a quiescent system.

use std::collections::BTreeMap;

use linechat_client::{ChatClient, ClientConfig, ClientEvent, ClientRuntime, Exit};
use linechat_core::{ConnectionId, DEFAULT_HOST, DEFAULT_PORT, MemoryDisplay};
use linechat_server::{Flow, ServerDriver, ServerRuntime};

use crate::sim_network::{SimClientTransport, SimNetwork, SimServerTransport};

struct SimClient {
    runtime: ClientRuntime<SimClientTransport, MemoryDisplay>,
    display: MemoryDisplay,
    exit: Option<Exit>,
}

/// Server, clients and operator console over an in-memory network.
pub struct SimWorld {
    net: SimNetwork,
    server: ServerRuntime<SimServerTransport, MemoryDisplay>,
    server_display: MemoryDisplay,
    clients: BTreeMap<String, SimClient>,
    flow: Flow,
}

impl SimWorld {
    /// Create a world whose server listens on [`DEFAULT_PORT`].
    pub async fn new() -> Self {
        let mut world = Self::stopped(DEFAULT_PORT);
        if let Err(e) = world.server.start().await {
            tracing::error!("Simulated server failed to listen: {e}");
        }
        world
    }

    /// Create a world whose server is configured for `port` but not
    /// listening.
    pub fn stopped(port: u16) -> Self {
        let net = SimNetwork::new();
        let server_display = MemoryDisplay::new();
        let server = ServerRuntime::new(port, net.server_transport(), server_display.clone());
        Self { net, server, server_display, clients: BTreeMap::new(), flow: Flow::Continue }
    }

    /// Start a client named `name` that logs in as `login_id`.
    pub async fn add_client(&mut self, name: &str, login_id: &str) {
        let config = ClientConfig {
            login_id: login_id.to_owned(),
            host: DEFAULT_HOST.to_owned(),
            port: self.server.console().port(),
        };
        let display = MemoryDisplay::new();
        let mut runtime =
            ClientRuntime::new(ChatClient::new(config), self.net.client_transport(), display.clone());
        let exit = runtime.start().await;

        self.clients.insert(name.to_owned(), SimClient { runtime, display, exit });
        self.settle().await;
    }

    /// Type a line at a client's console. Ignored once the client exited.
    pub async fn client_input(&mut self, name: &str, line: &str) {
        if let Some(client) = self.clients.get_mut(name) {
            if client.exit.is_none() {
                client.exit = client.runtime.dispatch(ClientEvent::Input(line.to_owned())).await;
            }
        }
        self.settle().await;
    }

    /// Type a line at the operator console.
    pub async fn operator_input(&mut self, line: &str) -> Flow {
        if self.flow == Flow::Continue {
            self.flow = self.server.handle_console(line).await;
        }
        self.settle().await;
        self.flow
    }

    /// Deliver queued events until the network is quiet.
    pub async fn settle(&mut self) {
        loop {
            let mut progressed = false;

            while let Some(event) = self.net.next_server_event() {
                self.server.dispatch(event).await;
                progressed = true;
            }

            for client in self.clients.values_mut() {
                let Some(conn) = client.runtime.transport().connection() else {
                    continue;
                };
                while client.exit.is_none() {
                    let Some(event) = self.net.next_client_event(conn) else {
                        break;
                    };
                    client.exit = client.runtime.dispatch(event).await;
                    progressed = true;
                }
            }

            if !progressed {
                break;
            }
        }
    }

    /// Send a raw line from `name`'s connection, as a misbehaving client
    /// would.
    pub async fn inject_payload(&mut self, name: &str, line: &str) {
        if let Some(conn) = self.connection_of(name) {
            self.net.inject_payload(conn, line);
        }
        self.settle().await;
    }

    /// Make server sends to `name` fail.
    pub fn fail_delivery(&self, name: &str) {
        if let Some(conn) = self.connection_of(name) {
            self.net.fail_delivery(conn);
        }
    }

    /// Report `name`'s connection as not alive to the server.
    pub async fn lose_liveness(&mut self, name: &str) {
        if let Some(conn) = self.connection_of(name) {
            self.net.report_liveness(conn, false);
        }
        self.settle().await;
    }

    /// Break `name`'s connection with a transport error on both ends.
    pub async fn break_connection(&mut self, name: &str) {
        if let Some(conn) = self.connection_of(name) {
            self.net.break_connection(conn, "connection reset");
        }
        self.settle().await;
    }

    /// Server-side id of `name`'s current (or last) connection.
    pub fn connection_of(&self, name: &str) -> Option<ConnectionId> {
        self.clients.get(name)?.runtime.transport().connection()
    }

    /// Lines shown on `name`'s console.
    pub fn client_lines(&self, name: &str) -> Vec<String> {
        self.clients.get(name).map(|c| c.display.lines()).unwrap_or_default()
    }

    /// Whether `name`'s console showed `line`.
    pub fn client_saw(&self, name: &str, line: &str) -> bool {
        self.clients.get(name).is_some_and(|c| c.display.contains(line))
    }

    /// Forget every line shown so far, on all consoles.
    pub fn clear_output(&self) {
        self.server_display.clear();
        for client in self.clients.values() {
            client.display.clear();
        }
    }

    /// How `name` terminated, if it did.
    pub fn client_exit(&self, name: &str) -> Option<Exit> {
        self.clients.get(name)?.exit
    }

    /// `name`'s client state machine.
    pub fn client(&self, name: &str) -> Option<&ChatClient> {
        self.clients.get(name).map(|c| c.runtime.client())
    }

    /// Lines shown on the operator console.
    pub fn server_lines(&self) -> Vec<String> {
        self.server_display.lines()
    }

    /// Whether the operator console showed `line`.
    pub fn server_saw(&self, line: &str) -> bool {
        self.server_display.contains(line)
    }

    /// Server driver (registry inspection).
    pub fn driver(&self) -> &ServerDriver {
        self.server.driver()
    }

    /// Whether the server accepts new connections.
    pub fn is_listening(&self) -> bool {
        self.net.listening_port().is_some()
    }

    /// Configured server port.
    pub fn server_port(&self) -> u16 {
        self.server.console().port()
    }
}
