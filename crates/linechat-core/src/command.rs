//! Console input parsing.
//!
//! Both consoles treat a line starting with `#` as a command: the first
//! whitespace-separated token is the name (including `#`), the rest are
//! positional arguments. Any other line is free text.

use crate::error::CommandError;

/// One line typed at a console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// `#name arg...`
    Command(Command),
    /// Free text, forwarded verbatim (possibly empty).
    Text(String),
}

impl ConsoleInput {
    /// Classify a console line.
    pub fn parse(line: &str) -> Self {
        Command::parse(line).map_or_else(|| Self::Text(line.to_owned()), Self::Command)
    }
}

/// A parsed `#` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    /// Parse a line, returning `None` unless it starts with `#`.
    pub fn parse(line: &str) -> Option<Self> {
        if !line.starts_with('#') {
            return None;
        }
        let mut tokens = line.split_whitespace().map(str::to_owned);
        let name = tokens.next()?;
        Some(Self { name, args: tokens.collect() })
    }

    /// Command name, including the leading `#`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Argument at `index`.
    pub fn arg(&self, index: usize) -> Result<&str, CommandError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CommandError::MissingArgument { command: self.name.clone(), index })
    }

    /// Argument at `index` parsed as a port number.
    pub fn port_arg(&self, index: usize) -> Result<u16, CommandError> {
        let value = self.arg(index)?;
        value.parse().map_err(|_| CommandError::InvalidPort {
            command: self.name.clone(),
            value: value.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn command_with_args() {
        let cmd = Command::parse("#sethost  example.org ").unwrap();
        assert_eq!(ConsoleInput::parse("#sethost  example.org "), ConsoleInput::Command(cmd.clone()));
        assert_eq!(cmd.name(), "#sethost");
        assert_eq!(cmd.args(), ["example.org".to_owned()]);
        assert_eq!(cmd.arg(0), Ok("example.org"));
    }

    #[test]
    fn text_is_verbatim() {
        assert_eq!(ConsoleInput::parse(" hi #there"), ConsoleInput::Text(" hi #there".into()));
        assert_eq!(ConsoleInput::parse(""), ConsoleInput::Text(String::new()));
    }

    #[test]
    fn missing_argument() {
        let cmd = Command::parse("#setport").unwrap();
        assert_eq!(
            cmd.port_arg(0),
            Err(CommandError::MissingArgument { command: "#setport".into(), index: 0 })
        );
    }

    #[test]
    fn invalid_port() {
        let cmd = Command::parse("#setport abc").unwrap();
        assert_eq!(
            cmd.port_arg(0),
            Err(CommandError::InvalidPort { command: "#setport".into(), value: "abc".into() })
        );
        assert_eq!(Command::parse("#setport 6000").unwrap().port_arg(0), Ok(6000));
    }

    #[test]
    fn lone_hash_is_a_command() {
        let cmd = Command::parse("#").unwrap();
        assert_eq!(cmd.name(), "#");
        assert!(cmd.args().is_empty());
    }

    proptest! {
        #[test]
        fn prop_lines_without_hash_are_text(line in "[^#][a-z #]{0,30}") {
            prop_assert_eq!(ConsoleInput::parse(&line), ConsoleInput::Text(line.clone()));
        }

        #[test]
        fn prop_port_arg_accepts_any_u16(port: u16) {
            let cmd = Command::parse(&format!("#setport {port}")).unwrap();
            prop_assert_eq!(cmd.port_arg(0), Ok(port));
        }
    }
}
