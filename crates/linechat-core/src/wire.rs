//! Line-based wire grammar.
//!
//! Every message is one line of text terminated by `\n`. Client-to-server
//! payloads are either the login handshake (`#login <id>`) or ordinary chat
//! text. Server-to-client payloads are relayed chat (`From <id> > text`),
//! operator broadcasts (`SERVER MSG > text`) and the relogin rejection.

/// First token of a login handshake payload.
pub const LOGIN_COMMAND: &str = "#login";

/// Sent to a client that attempts to log in a second time.
pub const RELOGIN_REJECTED: &str = "Cannot login once already logged in. Terminating connection.";

/// Prefix of every operator-originated broadcast.
pub const SERVER_MSG_PREFIX: &str = "SERVER MSG > ";

/// Identity shown in relayed chat for a connection that never logged in.
pub const UNIDENTIFIED: &str = "null";

/// A payload received by the server from one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPayload {
    /// Login handshake. `login_id` is `None` when the id token is missing.
    Login {
        /// Identity the connection claims
        login_id: Option<String>,
    },
    /// Anything else, relayed verbatim.
    Chat(String),
}

impl ClientPayload {
    /// Classify a received line.
    ///
    /// Only a first token exactly equal to `#login` makes a handshake, so
    /// `#loginfoo` is chat. Extra tokens after the id are ignored.
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        if tokens.next() == Some(LOGIN_COMMAND) {
            return Self::Login { login_id: tokens.next().map(str::to_owned) };
        }
        Self::Chat(line.to_owned())
    }
}

/// Handshake line a client sends right after connecting.
pub fn login_line(login_id: &str) -> String {
    format!("{LOGIN_COMMAND} {login_id}")
}

/// Relayed chat line, attributed to `sender` or to [`UNIDENTIFIED`].
pub fn chat_line(sender: Option<&str>, text: &str) -> String {
    format!("From {} > {text}", sender.unwrap_or(UNIDENTIFIED))
}

/// Operator broadcast line.
pub fn server_line(text: &str) -> String {
    format!("{SERVER_MSG_PREFIX}{text}")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn login_with_id() {
        assert_eq!(
            ClientPayload::parse("#login alice"),
            ClientPayload::Login { login_id: Some("alice".into()) }
        );
    }

    #[test]
    fn login_ignores_trailing_tokens() {
        assert_eq!(
            ClientPayload::parse("#login  bob extra words"),
            ClientPayload::Login { login_id: Some("bob".into()) }
        );
    }

    #[test]
    fn bare_login_has_no_id() {
        assert_eq!(ClientPayload::parse("#login"), ClientPayload::Login { login_id: None });
    }

    #[test]
    fn glued_token_is_chat() {
        assert_eq!(ClientPayload::parse("#loginfoo"), ClientPayload::Chat("#loginfoo".into()));
    }

    #[test]
    fn chat_attribution() {
        assert_eq!(chat_line(Some("alice"), "hi"), "From alice > hi");
        assert_eq!(chat_line(None, "hi"), "From null > hi");
        assert_eq!(server_line("hello"), "SERVER MSG > hello");
        assert_eq!(login_line("carol"), "#login carol");
    }

    proptest! {
        #[test]
        fn prop_non_login_is_relayed_verbatim(line in "[a-zA-Z0-9 #>.]{0,40}") {
            prop_assume!(line.split_whitespace().next() != Some(LOGIN_COMMAND));
            prop_assert_eq!(ClientPayload::parse(&line), ClientPayload::Chat(line.clone()));
        }

        #[test]
        fn prop_login_line_parses_back(id in "[a-zA-Z0-9_]{1,16}") {
            prop_assert_eq!(
                ClientPayload::parse(&login_line(&id)),
                ClientPayload::Login { login_id: Some(id) }
            );
        }
    }
}
