//! Connection registry for session identity tracking.
//!
//! Every accepted connection gets an entry here until it disconnects. The
//! entry records the login identity (if any) and whether the connection is
//! still believed alive. A connection may log in exactly once while it is
//! alive; after a liveness loss it may identify again.

use std::collections::BTreeMap;

use linechat_core::ConnectionId;

/// Login state of one session, derived from [`SessionInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no login yet.
    Unidentified,
    /// Logged in and alive. Further logins are rejected.
    Identified,
    /// Logged in, but the connection was observed not alive.
    IdentifiedStale,
}

/// Information about a registered session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Identity claimed by the login handshake
    pub login_id: Option<String>,
    /// Whether the connection is believed alive
    pub live: bool,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionInfo {
    /// Create a fresh, unidentified session.
    pub fn new() -> Self {
        Self { login_id: None, live: true }
    }

    /// Current login state.
    pub fn state(&self) -> SessionState {
        match (&self.login_id, self.live) {
            (None, _) => SessionState::Unidentified,
            (Some(_), true) => SessionState::Identified,
            (Some(_), false) => SessionState::IdentifiedStale,
        }
    }
}

/// Result of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Identity recorded.
    Accepted,
    /// Session already identified and alive.
    Rejected,
    /// No such session.
    UnknownConnection,
}

/// Registry of live sessions, ordered by connection id so broadcast order
/// is stable.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: BTreeMap<ConnectionId, SessionInfo>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted connection.
    ///
    /// Returns `false` if it was already registered.
    pub fn register(&mut self, conn: ConnectionId) -> bool {
        if self.sessions.contains_key(&conn) {
            return false;
        }
        self.sessions.insert(conn, SessionInfo::new());
        true
    }

    /// Remove a session. Idempotent.
    pub fn unregister(&mut self, conn: ConnectionId) -> Option<SessionInfo> {
        self.sessions.remove(&conn)
    }

    /// Attempt to record `login_id` for `conn`.
    pub fn login(&mut self, conn: ConnectionId, login_id: &str) -> LoginOutcome {
        let Some(session) = self.sessions.get_mut(&conn) else {
            return LoginOutcome::UnknownConnection;
        };

        match session.state() {
            SessionState::Identified => LoginOutcome::Rejected,
            SessionState::Unidentified | SessionState::IdentifiedStale => {
                session.login_id = Some(login_id.to_owned());
                session.live = true;
                LoginOutcome::Accepted
            },
        }
    }

    /// Record a liveness observation. Returns `false` for unknown sessions.
    pub fn set_liveness(&mut self, conn: ConnectionId, alive: bool) -> bool {
        match self.sessions.get_mut(&conn) {
            Some(session) => {
                session.live = alive;
                true
            },
            None => false,
        }
    }

    /// Login identity of a session, `None` if unidentified or unknown.
    pub fn identity(&self, conn: ConnectionId) -> Option<&str> {
        self.sessions.get(&conn)?.login_id.as_deref()
    }

    /// Session metadata. `None` if the session doesn't exist.
    pub fn session(&self, conn: ConnectionId) -> Option<&SessionInfo> {
        self.sessions.get(&conn)
    }

    /// Whether a session exists.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.sessions.contains_key(&conn)
    }

    /// All registered connections in ascending id order.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.sessions.keys().copied().collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions with a login identity.
    pub fn identified_count(&self) -> usize {
        self.sessions.values().filter(|s| s.login_id.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);

    #[test]
    fn register_twice_fails() {
        let mut registry = ConnectionRegistry::new();
        assert!(registry.register(A));
        assert!(!registry.register(A));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn login_once_while_alive() {
        let mut registry = ConnectionRegistry::new();
        registry.register(A);

        assert_eq!(registry.login(A, "alice"), LoginOutcome::Accepted);
        assert_eq!(registry.login(A, "mallory"), LoginOutcome::Rejected);
        assert_eq!(registry.identity(A), Some("alice"));
    }

    #[test]
    fn stale_session_may_identify_again() {
        let mut registry = ConnectionRegistry::new();
        registry.register(A);
        registry.login(A, "alice");

        assert!(registry.set_liveness(A, false));
        assert_eq!(registry.session(A).map(SessionInfo::state), Some(SessionState::IdentifiedStale));

        assert_eq!(registry.login(A, "alice2"), LoginOutcome::Accepted);
        assert_eq!(registry.session(A).map(SessionInfo::state), Some(SessionState::Identified));
        assert_eq!(registry.identity(A), Some("alice2"));
    }

    #[test]
    fn unknown_connection() {
        let mut registry = ConnectionRegistry::new();
        assert_eq!(registry.login(B, "bob"), LoginOutcome::UnknownConnection);
        assert!(!registry.set_liveness(B, true));
        assert_eq!(registry.unregister(B), None);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        registry.register(A);
        registry.register(B);
        registry.login(B, "bob");

        assert_eq!(registry.identified_count(), 1);
        assert!(registry.unregister(B).is_some());
        assert!(registry.unregister(B).is_none());
        assert_eq!(registry.connections(), vec![A]);
    }

    proptest! {
        #[test]
        fn prop_identity_never_changes_while_alive(ids in prop::collection::vec("[a-z]{1,8}", 1..10)) {
            let mut registry = ConnectionRegistry::new();
            registry.register(A);

            let first = ids[0].clone();
            prop_assert_eq!(registry.login(A, &first), LoginOutcome::Accepted);
            for id in &ids[1..] {
                prop_assert_eq!(registry.login(A, id), LoginOutcome::Rejected);
            }
            prop_assert_eq!(registry.identity(A), Some(first.as_str()));
        }
    }
}
