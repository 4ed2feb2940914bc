//! Server driver.
//!
//! Ties the [`ConnectionRegistry`] to the login handshake and the routing
//! policy. The driver performs no I/O: transport callbacks arrive as
//! [`ServerEvent`]s and the driver answers with [`ServerAction`]s for the
//! runtime to execute.

use linechat_core::{
    ConnectionId,
    wire::{self, ClientPayload},
};

use crate::registry::{ConnectionRegistry, LoginOutcome};

/// Events that the server driver processes.
///
/// These are produced by the runtime from transport notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A new connection was accepted
    ClientConnected {
        /// Connection assigned by the transport
        conn: ConnectionId,
    },

    /// A line was received from a connection
    Payload {
        /// Connection that sent the line
        conn: ConnectionId,
        /// The received line, without terminator
        line: String,
    },

    /// A connection ended normally
    ClientDisconnected {
        /// Connection that ended
        conn: ConnectionId,
    },

    /// A connection ended with an error
    ClientException {
        /// Connection that failed
        conn: ConnectionId,
        /// Rendered error
        error: String,
    },

    /// The transport's view of a connection's delivery path changed
    LivenessChanged {
        /// Affected connection
        conn: ConnectionId,
        /// Whether the connection is alive
        alive: bool,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by the runtime (TCP or simulation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Send a line to one connection
    SendTo {
        /// Target connection
        conn: ConnectionId,
        /// Line to send
        line: String,
    },

    /// Send a line to every listed connection, best effort
    Broadcast {
        /// Connections registered when the broadcast was produced
        recipients: Vec<ConnectionId>,
        /// Line to send
        line: String,
    },

    /// Close a connection
    Close {
        /// Connection to close
        conn: ConnectionId,
        /// Reason for closure
        reason: String,
    },

    /// Show a line on the operator console
    Display(String),

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for driver actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
}

/// Action-based server driver.
#[derive(Debug, Default)]
pub struct ServerDriver {
    registry: ConnectionRegistry,
}

impl ServerDriver {
    /// Create a driver with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(&mut self, event: ServerEvent) -> Vec<ServerAction> {
        match event {
            ServerEvent::ClientConnected { conn } => self.on_client_connected(conn),
            ServerEvent::Payload { conn, line } => self.on_payload(conn, &line),
            ServerEvent::ClientDisconnected { conn } => self.on_client_disconnected(conn),
            ServerEvent::ClientException { conn, error } => self.on_client_exception(conn, &error),
            ServerEvent::LivenessChanged { conn, alive } => self.on_liveness_changed(conn, alive),
        }
    }

    /// Register a newly accepted connection.
    pub fn on_client_connected(&mut self, conn: ConnectionId) -> Vec<ServerAction> {
        if !self.registry.register(conn) {
            return vec![log(LogLevel::Warn, format!("{conn} accepted twice"))];
        }

        vec![
            log(LogLevel::Info, format!("{conn} accepted")),
            ServerAction::Display("A client has connected.".to_owned()),
        ]
    }

    /// Handle one line from a connection: handshake or chat.
    pub fn on_payload(&mut self, conn: ConnectionId, line: &str) -> Vec<ServerAction> {
        if !self.registry.contains(conn) {
            return vec![log(LogLevel::Warn, format!("payload from unknown {conn} dropped"))];
        }

        let sender = self.registry.identity(conn).unwrap_or(wire::UNIDENTIFIED);
        let mut actions =
            vec![log(LogLevel::Info, format!("Message received: {line} from {sender}"))];

        match ClientPayload::parse(line) {
            ClientPayload::Login { login_id: Some(login_id) } => {
                actions.extend(self.login(conn, &login_id));
            },
            ClientPayload::Login { login_id: None } => {
                actions.push(log(LogLevel::Warn, format!("{conn} sent a login without an id")));
                actions.push(ServerAction::Close {
                    conn,
                    reason: "malformed login".to_owned(),
                });
            },
            ClientPayload::Chat(text) => actions.extend(self.route(conn, &text)),
        }

        actions
    }

    fn login(&mut self, conn: ConnectionId, login_id: &str) -> Vec<ServerAction> {
        match self.registry.login(conn, login_id) {
            LoginOutcome::Accepted => self.announce(&format!("{login_id} has logged in.")),
            LoginOutcome::Rejected => vec![
                ServerAction::SendTo { conn, line: wire::RELOGIN_REJECTED.to_owned() },
                ServerAction::Close { conn, reason: "login while already logged in".to_owned() },
            ],
            LoginOutcome::UnknownConnection => {
                vec![log(LogLevel::Warn, format!("login from unknown {conn} dropped"))]
            },
        }
    }

    /// Remove a connection that ended normally.
    pub fn on_client_disconnected(&mut self, conn: ConnectionId) -> Vec<ServerAction> {
        match self.registry.unregister(conn) {
            Some(session) => {
                let id = session.login_id.as_deref().unwrap_or(wire::UNIDENTIFIED);
                vec![ServerAction::Display(format!("{id} has disconnected."))]
            },
            None => Vec::new(),
        }
    }

    /// Remove a connection that failed.
    pub fn on_client_exception(&mut self, conn: ConnectionId, error: &str) -> Vec<ServerAction> {
        let mut actions = vec![log(LogLevel::Warn, format!("{conn} failed: {error}"))];
        actions.extend(self.on_client_disconnected(conn));
        actions
    }

    /// Record a liveness observation from the transport.
    pub fn on_liveness_changed(&mut self, conn: ConnectionId, alive: bool) -> Vec<ServerAction> {
        if self.registry.set_liveness(conn, alive) {
            vec![log(LogLevel::Debug, format!("{conn} liveness now {alive}"))]
        } else {
            Vec::new()
        }
    }

    /// Relay chat text from `from` to every connection, attributed to its
    /// identity (or `null` before login).
    pub fn route(&self, from: ConnectionId, text: &str) -> Vec<ServerAction> {
        self.broadcast(wire::chat_line(self.registry.identity(from), text))
    }

    /// Operator message: echoed locally and sent to every connection.
    pub fn announce(&self, text: &str) -> Vec<ServerAction> {
        let line = wire::server_line(text);
        let mut actions = vec![ServerAction::Display(format!("> {line}"))];
        actions.extend(self.broadcast(line));
        actions
    }

    /// Address `line` to every registered connection, sender included.
    pub fn broadcast(&self, line: String) -> Vec<ServerAction> {
        if self.registry.is_empty() {
            return Vec::new();
        }
        vec![ServerAction::Broadcast { recipients: self.registry.connections(), line }]
    }

    /// Close every registered connection.
    pub fn close_all(&self, reason: &str) -> Vec<ServerAction> {
        self.registry
            .connections()
            .into_iter()
            .map(|conn| ServerAction::Close { conn, reason: reason.to_owned() })
            .collect()
    }

    /// Registry (for inspection).
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

fn log(level: LogLevel, message: String) -> ServerAction {
    ServerAction::Log { level, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionState;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);

    fn visible(actions: &[ServerAction]) -> Vec<ServerAction> {
        actions.iter().filter(|a| !matches!(a, ServerAction::Log { .. })).cloned().collect()
    }

    fn connected(conns: &[ConnectionId]) -> ServerDriver {
        let mut driver = ServerDriver::new();
        for &conn in conns {
            driver.process_event(ServerEvent::ClientConnected { conn });
        }
        driver
    }

    #[test]
    fn accept_registers_and_reports() {
        let mut driver = ServerDriver::new();
        let actions = driver.process_event(ServerEvent::ClientConnected { conn: A });

        assert_eq!(visible(&actions), vec![ServerAction::Display("A client has connected.".into())]);
        assert_eq!(driver.registry().len(), 1);
    }

    #[test]
    fn login_is_announced_to_everyone() {
        let mut driver = connected(&[A, B]);
        let actions = driver.on_payload(A, "#login alice");

        assert_eq!(
            visible(&actions),
            vec![
                ServerAction::Display("> SERVER MSG > alice has logged in.".into()),
                ServerAction::Broadcast {
                    recipients: vec![A, B],
                    line: "SERVER MSG > alice has logged in.".into(),
                },
            ]
        );
        assert_eq!(driver.registry().identity(A), Some("alice"));
    }

    #[test]
    fn relogin_is_rejected_and_closed() {
        let mut driver = connected(&[A]);
        driver.on_payload(A, "#login alice");

        let actions = driver.on_payload(A, "#login mallory");
        assert_eq!(
            visible(&actions),
            vec![
                ServerAction::SendTo { conn: A, line: wire::RELOGIN_REJECTED.into() },
                ServerAction::Close { conn: A, reason: "login while already logged in".into() },
            ]
        );
        assert_eq!(driver.registry().identity(A), Some("alice"));
    }

    #[test]
    fn stale_connection_can_log_in_again() {
        let mut driver = connected(&[A]);
        driver.on_payload(A, "#login alice");
        driver.process_event(ServerEvent::LivenessChanged { conn: A, alive: false });

        let actions = driver.on_payload(A, "#login alice");
        assert!(actions.contains(&ServerAction::Display("> SERVER MSG > alice has logged in.".into())));
        assert_eq!(
            driver.registry().session(A).map(|s| s.state()),
            Some(SessionState::Identified)
        );
    }

    #[test]
    fn chat_is_attributed() {
        let mut driver = connected(&[A, B]);
        driver.on_payload(A, "#login alice");

        let actions = driver.on_payload(A, "yo");
        assert_eq!(
            visible(&actions),
            vec![ServerAction::Broadcast { recipients: vec![A, B], line: "From alice > yo".into() }]
        );
    }

    #[test]
    fn chat_before_login_is_attributed_to_null() {
        let mut driver = connected(&[A]);
        let actions = driver.on_payload(A, "early");
        assert_eq!(
            visible(&actions),
            vec![ServerAction::Broadcast { recipients: vec![A], line: "From null > early".into() }]
        );
    }

    #[test]
    fn bare_login_closes_connection() {
        let mut driver = connected(&[A]);
        let actions = driver.on_payload(A, "#login");
        assert_eq!(
            visible(&actions),
            vec![ServerAction::Close { conn: A, reason: "malformed login".into() }]
        );
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut driver = connected(&[A]);
        driver.on_payload(A, "#login alice");

        let first = driver.process_event(ServerEvent::ClientDisconnected { conn: A });
        assert_eq!(first, vec![ServerAction::Display("alice has disconnected.".into())]);

        let second =
            driver.process_event(ServerEvent::ClientException { conn: A, error: "reset".into() });
        assert!(visible(&second).is_empty());
        assert!(driver.registry().is_empty());
    }

    #[test]
    fn payload_from_unknown_connection_is_ignored() {
        let mut driver = connected(&[A]);
        let actions = driver.on_payload(B, "hello");
        assert!(visible(&actions).is_empty());
    }

    #[test]
    fn close_all_targets_every_connection() {
        let driver = connected(&[A, B]);
        let actions = driver.close_all("server closing");
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| matches!(a, ServerAction::Close { .. })));
    }

    #[test]
    fn announce_without_connections_only_echoes() {
        let driver = ServerDriver::new();
        assert_eq!(driver.announce("hi"), vec![ServerAction::Display("> SERVER MSG > hi".into())]);
    }
}
