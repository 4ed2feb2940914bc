//! Operator console interpreter.
//!
//! Parses operator input into [`ConsoleAction`]s. Lines starting with `#`
//! are commands; anything else is an operator message for every client.
//! The interpreter owns the configured port and is told whether the
//! transport is listening, so it can enforce `#start`/`#stop`
//! preconditions without touching I/O.

use linechat_core::{Command, ConsoleInput, DEFAULT_PORT};

/// What the runtime should do in response to operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    /// Shut the server down.
    Quit,
    /// Stop accepting new connections; existing ones stay open.
    StopListening,
    /// Stop listening and disconnect every client.
    Close,
    /// Start accepting connections on `port`.
    StartListening {
        /// Port to bind
        port: u16,
    },
    /// Show a line on the operator console only.
    Display(String),
    /// Echo locally and broadcast as an operator message.
    Announce(String),
}

/// Operator command interpreter.
#[derive(Debug, Clone)]
pub struct ServerConsole {
    port: u16,
}

impl Default for ServerConsole {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl ServerConsole {
    /// Create an interpreter configured for `port`.
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Configured listen port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Interpret one line of operator input.
    pub fn handle_input(&mut self, line: &str, listening: bool) -> Vec<ConsoleAction> {
        match ConsoleInput::parse(line) {
            ConsoleInput::Command(command) => self.handle_command(&command, listening),
            ConsoleInput::Text(text) => vec![ConsoleAction::Announce(text)],
        }
    }

    fn handle_command(&mut self, command: &Command, listening: bool) -> Vec<ConsoleAction> {
        match command.name() {
            "#quit" => vec![display("Terminating server..."), ConsoleAction::Quit],
            "#stop" if !listening => vec![display("Cannot stop when the server is already stopped")],
            "#stop" => vec![ConsoleAction::StopListening],
            "#close" => vec![ConsoleAction::Close],
            "#setport" => match command.port_arg(0) {
                Ok(port) => {
                    self.port = port;
                    vec![display(&format!("The port has been set to {port}"))]
                },
                Err(e) => {
                    tracing::debug!("Rejected {}: {e}", command.name());
                    vec![display("Please provide required parameters")]
                },
            },
            "#start" if listening => vec![display(
                "Cannot start listening for clients when the server is already listening",
            )],
            "#start" => vec![ConsoleAction::StartListening { port: self.port }],
            "#getport" => vec![display(&format!("The port number is {}", self.port))],
            _ => vec![display("Could not recognize command. Please try again.")],
        }
    }
}

fn display(line: &str) -> ConsoleAction {
    ConsoleAction::Display(line.to_owned())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn free_text_is_announced() {
        let mut console = ServerConsole::default();
        assert_eq!(console.handle_input("hi", true), vec![ConsoleAction::Announce("hi".into())]);
    }

    #[test]
    fn quit_reports_then_quits() {
        let mut console = ServerConsole::default();
        assert_eq!(
            console.handle_input("#quit", true),
            vec![display("Terminating server..."), ConsoleAction::Quit]
        );
    }

    #[test]
    fn stop_requires_listening() {
        let mut console = ServerConsole::default();
        assert_eq!(console.handle_input("#stop", true), vec![ConsoleAction::StopListening]);
        assert_eq!(
            console.handle_input("#stop", false),
            vec![display("Cannot stop when the server is already stopped")]
        );
    }

    #[test]
    fn start_requires_not_listening() {
        let mut console = ServerConsole::new(6000);
        assert_eq!(
            console.handle_input("#start", false),
            vec![ConsoleAction::StartListening { port: 6000 }]
        );
        assert_eq!(
            console.handle_input("#start", true),
            vec![display("Cannot start listening for clients when the server is already listening")]
        );
    }

    #[test]
    fn setport_then_getport() {
        let mut console = ServerConsole::default();
        assert_eq!(
            console.handle_input("#setport 7000", true),
            vec![display("The port has been set to 7000")]
        );
        assert_eq!(console.handle_input("#getport", false), vec![display("The port number is 7000")]);
    }

    #[test]
    fn unknown_command() {
        let mut console = ServerConsole::default();
        assert_eq!(
            console.handle_input("#dance", true),
            vec![display("Could not recognize command. Please try again.")]
        );
    }

    proptest! {
        #[test]
        fn prop_malformed_setport_keeps_port(arg in "[a-z]{0,6}", port: u16) {
            let mut console = ServerConsole::new(port);
            let actions = console.handle_input(&format!("#setport {arg}"), false);

            prop_assert_eq!(actions, vec![display("Please provide required parameters")]);
            prop_assert_eq!(console.port(), port);
            prop_assert_eq!(
                console.handle_input("#getport", false),
                vec![display(&format!("The port number is {port}"))]
            );
        }
    }
}
