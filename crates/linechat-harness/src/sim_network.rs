//! In-memory network shared by simulated server and client transports.
//!
//! Nothing is delivered on its own: sends and closes enqueue events, and
//! [`SimWorld::settle`](crate::SimWorld::settle) pumps the queues into the
//! runtimes. Every transport call completes without yielding, so runs are
//! fully deterministic.

use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use linechat_client::ClientEvent;
use linechat_core::{ClientTransport, ConnectionId, ServerTransport, TransportError};
use linechat_server::ServerEvent;

#[derive(Debug, Default)]
struct NetState {
    listening: Option<u16>,
    open: BTreeSet<ConnectionId>,
    next_id: u64,
    to_server: VecDeque<ServerEvent>,
    to_client: HashMap<ConnectionId, VecDeque<ClientEvent>>,
    failing: HashSet<ConnectionId>,
}

/// Handle to the shared simulated network. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimNetwork {
    state: Arc<Mutex<NetState>>,
}

impl SimNetwork {
    /// Create an empty network with nothing listening.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transport for the server runtime.
    pub fn server_transport(&self) -> SimServerTransport {
        SimServerTransport { net: self.clone() }
    }

    /// Transport for one client runtime.
    pub fn client_transport(&self) -> SimClientTransport {
        SimClientTransport { net: self.clone(), conn: None }
    }

    /// Next event queued for the server.
    pub fn next_server_event(&self) -> Option<ServerEvent> {
        self.lock().to_server.pop_front()
    }

    /// Next event queued for the client holding `conn`.
    pub fn next_client_event(&self, conn: ConnectionId) -> Option<ClientEvent> {
        self.lock().to_client.get_mut(&conn)?.pop_front()
    }

    /// Make every later server send to `conn` fail.
    pub fn fail_delivery(&self, conn: ConnectionId) {
        self.lock().failing.insert(conn);
    }

    /// Report a liveness change for `conn` to the server.
    pub fn report_liveness(&self, conn: ConnectionId, alive: bool) {
        self.lock().to_server.push_back(ServerEvent::LivenessChanged { conn, alive });
    }

    /// Deliver `line` to the server as if `conn` had sent it, bypassing the
    /// client's command interpreter.
    pub fn inject_payload(&self, conn: ConnectionId, line: &str) {
        let mut state = self.lock();
        if state.open.contains(&conn) {
            state.to_server.push_back(ServerEvent::Payload { conn, line: line.to_owned() });
        }
    }

    /// Break `conn`: both ends see an exception.
    pub fn break_connection(&self, conn: ConnectionId, error: &str) {
        let mut state = self.lock();
        if !state.open.remove(&conn) {
            return;
        }
        state.to_server.push_back(ServerEvent::ClientException { conn, error: error.to_owned() });
        state
            .to_client
            .entry(conn)
            .or_default()
            .push_back(ClientEvent::Exception { error: error.to_owned() });
    }

    /// Whether `conn` is open.
    pub fn is_open(&self, conn: ConnectionId) -> bool {
        self.lock().open.contains(&conn)
    }

    /// Port the server listens on, if any.
    pub fn listening_port(&self) -> Option<u16> {
        self.lock().listening
    }
}

/// Simulated [`ServerTransport`].
#[derive(Debug, Clone)]
pub struct SimServerTransport {
    net: SimNetwork,
}

impl ServerTransport for SimServerTransport {
    async fn listen(&mut self, port: u16) -> Result<(), TransportError> {
        let mut state = self.net.lock();
        match state.listening {
            Some(current) if current != port => {
                Err(TransportError::Listen(format!("already listening on {current}")))
            },
            _ => {
                state.listening = Some(port);
                Ok(())
            },
        }
    }

    async fn stop_listening(&mut self) {
        self.net.lock().listening = None;
    }

    fn is_listening(&self) -> bool {
        self.net.lock().listening.is_some()
    }

    async fn send(&mut self, conn: ConnectionId, line: &str) -> Result<(), TransportError> {
        let mut state = self.net.lock();
        if !state.open.contains(&conn) {
            return Err(TransportError::UnknownConnection(conn));
        }
        if state.failing.contains(&conn) {
            return Err(TransportError::Send(format!("injected failure on {conn}")));
        }
        state.to_client.entry(conn).or_default().push_back(ClientEvent::LineReceived(line.to_owned()));
        Ok(())
    }

    async fn close(&mut self, conn: ConnectionId) -> Result<(), TransportError> {
        let mut state = self.net.lock();
        if !state.open.remove(&conn) {
            return Err(TransportError::UnknownConnection(conn));
        }
        state.to_client.entry(conn).or_default().push_back(ClientEvent::Closed);
        Ok(())
    }
}

/// Simulated [`ClientTransport`].
#[derive(Debug, Clone)]
pub struct SimClientTransport {
    net: SimNetwork,
    conn: Option<ConnectionId>,
}

impl SimClientTransport {
    /// Server-side id of the current (or last) connection.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.conn
    }
}

impl ClientTransport for SimClientTransport {
    async fn open(&mut self, _host: &str, port: u16) -> Result<(), TransportError> {
        if self.is_connected() {
            return Err(TransportError::AlreadyConnected);
        }

        let mut state = self.net.lock();
        if state.listening != Some(port) {
            return Err(TransportError::Connection(format!("connection refused on port {port}")));
        }

        state.next_id += 1;
        let conn = ConnectionId(state.next_id);
        state.open.insert(conn);
        state.to_client.insert(conn, VecDeque::new());
        state.to_server.push_back(ServerEvent::ClientConnected { conn });
        self.conn = Some(conn);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let conn = self.conn.ok_or(TransportError::NotConnected)?;
        let mut state = self.net.lock();
        if !state.open.remove(&conn) {
            return Err(TransportError::NotConnected);
        }
        state.to_client.remove(&conn);
        state.to_server.push_back(ServerEvent::ClientDisconnected { conn });
        Ok(())
    }

    async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        let conn = self.conn.ok_or(TransportError::NotConnected)?;
        let mut state = self.net.lock();
        if !state.open.contains(&conn) {
            return Err(TransportError::NotConnected);
        }
        state.to_server.push_back(ServerEvent::Payload { conn, line: line.to_owned() });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some_and(|conn| self.net.is_open(conn))
    }
}
