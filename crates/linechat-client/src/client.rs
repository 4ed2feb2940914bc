//! Client session handler and command interpreter.
//!
//! [`ChatClient`] is a pure state machine: console input and transport
//! notifications arrive as [`ClientEvent`]s, and it answers with
//! [`ClientAction`]s for the runtime to execute. Terminating the process is
//! an action ([`ClientAction::Quit`]) so the client stays testable.

use std::process::ExitCode;

use linechat_core::{Command, ConsoleInput, DEFAULT_HOST, DEFAULT_PORT, wire};

use crate::error::ClientError;

/// Connection target and identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Identity sent in the login handshake
    pub login_id: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

impl ClientConfig {
    /// Config for `login_id` against the default host and port.
    pub fn new(login_id: impl Into<String>) -> Self {
        Self { login_id: login_id.into(), host: DEFAULT_HOST.to_owned(), port: DEFAULT_PORT }
    }

    /// Build a config from command-line values.
    ///
    /// # Errors
    ///
    /// [`ClientError::MissingLoginId`] if no login id was given.
    pub fn from_args(
        login_id: Option<String>,
        host: Option<String>,
        port: u16,
    ) -> Result<Self, ClientError> {
        let login_id = login_id.ok_or(ClientError::MissingLoginId)?;
        Ok(Self { login_id, host: host.unwrap_or_else(|| DEFAULT_HOST.to_owned()), port })
    }
}

/// Connection state as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection.
    Disconnected,
    /// Connect requested, not yet confirmed.
    Connecting,
    /// Connection open.
    Connected,
}

/// Who asked for the current connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOrigin {
    /// Initial connection at startup.
    Startup,
    /// The `#login` command.
    Command,
}

/// What an outgoing line was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    /// Login handshake.
    Login,
    /// Chat text typed by the user.
    Chat,
}

/// How the client process should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Normal termination (`#quit`, console closed).
    Success,
    /// Termination after an unrecoverable error.
    Failure,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Success => ExitCode::SUCCESS,
            Exit::Failure => ExitCode::FAILURE,
        }
    }
}

/// Events the client processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A line typed at the console
    Input(String),
    /// The connection was established
    Established,
    /// A line arrived from the server
    LineReceived(String),
    /// The connection closed
    Closed,
    /// The connection failed while waiting for messages
    Exception {
        /// Rendered error
        error: String,
    },
    /// Opening the connection failed
    ConnectFailed {
        /// Rendered error
        error: String,
    },
    /// Writing a line failed
    SendFailed {
        /// What the line was for
        kind: SendKind,
        /// Rendered error
        error: String,
    },
}

/// Actions the client produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a connection
    Connect {
        /// Target host
        host: String,
        /// Target port
        port: u16,
    },
    /// Send a line to the server
    Send {
        /// Line to send
        line: String,
        /// What the line is for
        kind: SendKind,
    },
    /// Close the connection and wait for confirmation
    Disconnect,
    /// Show a line to the user
    Display(String),
    /// Terminate the client
    Quit(Exit),
}

/// Client session handler and command interpreter.
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: ClientConfig,
    state: ConnectionState,
    origin: ConnectOrigin,
    pending_logoff: bool,
}

impl ChatClient {
    /// Create a disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            origin: ConnectOrigin::Startup,
            pending_logoff: false,
        }
    }

    /// Initial connection attempt.
    pub fn start(&mut self) -> Vec<ClientAction> {
        self.connect(ConnectOrigin::Startup)
    }

    /// Process an event and return actions to execute.
    pub fn process_event(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        match event {
            ClientEvent::Input(line) => self.on_input(&line),
            ClientEvent::Established => self.on_established(),
            ClientEvent::LineReceived(line) => self.on_line_received(&line),
            ClientEvent::Closed => self.on_closed(),
            ClientEvent::Exception { error } => self.on_exception(&error),
            ClientEvent::ConnectFailed { error } => self.on_connect_failed(&error),
            ClientEvent::SendFailed { kind, error } => self.on_send_failed(kind, &error),
        }
    }

    /// Interpret one console line.
    pub fn on_input(&mut self, line: &str) -> Vec<ClientAction> {
        match ConsoleInput::parse(line) {
            ConsoleInput::Command(command) => self.handle_command(&command),
            ConsoleInput::Text(line) => vec![ClientAction::Send { line, kind: SendKind::Chat }],
        }
    }

    fn handle_command(&mut self, command: &Command) -> Vec<ClientAction> {
        match command.name() {
            "#quit" => {
                let mut actions = vec![display("Terminating chat client...")];
                if self.is_connected() {
                    actions.push(ClientAction::Disconnect);
                }
                actions.push(ClientAction::Quit(Exit::Success));
                actions
            },
            "#logoff" => {
                if !self.is_connected() {
                    return vec![display("There is no connection to terminate.")];
                }
                self.pending_logoff = true;
                vec![ClientAction::Disconnect]
            },
            "#sethost" => {
                if self.is_connected() {
                    return vec![display("Cannot set host while connected.")];
                }
                match command.arg(0) {
                    Ok(host) => {
                        self.config.host = host.to_owned();
                        Vec::new()
                    },
                    Err(_) => vec![display("Please provide required parameters")],
                }
            },
            "#setport" => {
                if self.is_connected() {
                    return vec![display("Cannot set port while connected.")];
                }
                match command.port_arg(0) {
                    Ok(port) => {
                        self.config.port = port;
                        Vec::new()
                    },
                    Err(_) => vec![display("Please provide required parameters")],
                }
            },
            "#login" => {
                if self.is_connected() {
                    return vec![
                        display("Cannot login while connected."),
                        ClientAction::Disconnect,
                        ClientAction::Quit(Exit::Failure),
                    ];
                }
                self.connect(ConnectOrigin::Command)
            },
            "#gethost" => vec![display(&format!("The host name is {}", self.config.host))],
            "#getport" => vec![display(&format!("The port number is {}", self.config.port))],
            _ => vec![display("Could not recognize command. Please try again.")],
        }
    }

    fn connect(&mut self, origin: ConnectOrigin) -> Vec<ClientAction> {
        self.state = ConnectionState::Connecting;
        self.origin = origin;
        vec![ClientAction::Connect { host: self.config.host.clone(), port: self.config.port }]
    }

    /// Connection is open: log in.
    pub fn on_established(&mut self) -> Vec<ClientAction> {
        self.state = ConnectionState::Connected;
        let mut actions = vec![
            display("Connected. Attempting to login..."),
            ClientAction::Send { line: wire::login_line(&self.config.login_id), kind: SendKind::Login },
            display(&format!("Login success! Welcome, {}", self.config.login_id)),
        ];
        if self.origin == ConnectOrigin::Command {
            actions.push(display("Successfully connected to the server."));
        }
        actions
    }

    /// Show a server line.
    pub fn on_line_received(&mut self, line: &str) -> Vec<ClientAction> {
        vec![display(&format!("> {line}"))]
    }

    /// The connection closed, by us or by the server. No reconnect.
    pub fn on_closed(&mut self) -> Vec<ClientAction> {
        if self.state == ConnectionState::Disconnected && !self.pending_logoff {
            return Vec::new();
        }
        self.state = ConnectionState::Disconnected;

        let mut actions = vec![display("> The connection has been closed.")];
        if self.pending_logoff {
            self.pending_logoff = false;
            actions.push(display("Successfully disconnected from the server."));
        }
        actions
    }

    /// The connection failed while waiting for messages. Fatal.
    pub fn on_exception(&mut self, error: &str) -> Vec<ClientAction> {
        tracing::debug!("Connection exception: {error}");
        self.state = ConnectionState::Disconnected;
        vec![display("> The connection has been shut down."), ClientAction::Quit(Exit::Failure)]
    }

    /// Opening a connection failed. Fatal at startup only.
    pub fn on_connect_failed(&mut self, error: &str) -> Vec<ClientAction> {
        tracing::debug!("Connect failed: {error}");
        self.state = ConnectionState::Disconnected;
        match self.origin {
            ConnectOrigin::Startup => vec![
                display("Error: Can't setup connection! Terminating client."),
                ClientAction::Quit(Exit::Failure),
            ],
            ConnectOrigin::Command => vec![display(&format!(
                "Could not connect to {}:{}.",
                self.config.host, self.config.port
            ))],
        }
    }

    /// Writing to the server failed. Always fatal.
    pub fn on_send_failed(&mut self, kind: SendKind, error: &str) -> Vec<ClientAction> {
        tracing::debug!("Send failed: {error}");
        let notice = match kind {
            SendKind::Login => "Error logging in. \nTerminating client...",
            SendKind::Chat => "> Could not send message to server.  Terminating client.",
        };
        vec![display(notice), ClientAction::Quit(Exit::Failure)]
    }

    /// Whether a connection is open or being opened.
    pub fn is_connected(&self) -> bool {
        self.state != ConnectionState::Disconnected
    }

    /// Connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current connection target and identity.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn display(line: &str) -> ClientAction {
    ClientAction::Display(line.to_owned())
}
