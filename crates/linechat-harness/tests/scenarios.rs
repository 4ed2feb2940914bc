//! Scripted conversations over the simulated network.

use linechat_client::{ConnectionState, Exit};
use linechat_harness::SimWorld;
use linechat_server::{Flow, SessionState};

#[tokio::test]
async fn operator_message_reaches_bob() {
    let mut world = SimWorld::new().await;
    assert!(world.server_saw("Server listening for connections on port 5555"));

    world.add_client("bob", "bob").await;

    let conn = world.connection_of("bob").unwrap();
    let registry = world.driver().registry();
    assert_eq!(registry.identified_count(), 1);
    assert_eq!(registry.identity(conn), Some("bob"));
    assert_eq!(registry.session(conn).map(|s| s.state()), Some(SessionState::Identified));

    assert_eq!(
        world.client_lines("bob"),
        [
            "Connected. Attempting to login...",
            "Login success! Welcome, bob",
            "> SERVER MSG > bob has logged in.",
        ]
    );
    assert!(world.server_saw("A client has connected."));
    assert!(world.server_saw("> SERVER MSG > bob has logged in."));

    world.operator_input("hi").await;
    assert!(world.client_saw("bob", "> SERVER MSG > hi"));
    assert!(world.server_saw("> SERVER MSG > hi"));
}

#[tokio::test]
async fn alice_and_bob_chat() {
    let mut world = SimWorld::new().await;
    world.add_client("alice", "alice").await;
    world.add_client("bob", "bob").await;
    assert!(world.client_saw("alice", "> SERVER MSG > bob has logged in."));

    world.client_input("alice", "yo").await;
    assert!(world.client_saw("bob", "> From alice > yo"));
    assert!(world.client_saw("alice", "> From alice > yo"));
}

#[tokio::test]
async fn relogin_closes_only_the_offender() {
    let mut world = SimWorld::new().await;
    world.add_client("alice", "alice").await;
    world.add_client("bob", "bob").await;
    let bob = world.connection_of("bob").unwrap();

    world.inject_payload("bob", "#login robert").await;

    assert!(world.client_saw("bob", "> Cannot login once already logged in. Terminating connection."));
    assert!(world.client_saw("bob", "> The connection has been closed."));
    assert_eq!(world.client_exit("bob"), None);
    assert!(world.server_saw("bob has disconnected."));
    assert!(!world.driver().registry().contains(bob));

    world.client_input("alice", "still here").await;
    assert!(world.client_saw("alice", "> From alice > still here"));
    assert!(!world.client_saw("bob", "> From alice > still here"));
}

#[tokio::test]
async fn stale_connection_may_log_in_again() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;
    let conn = world.connection_of("bob").unwrap();

    world.lose_liveness("bob").await;
    assert_eq!(
        world.driver().registry().session(conn).map(|s| s.state()),
        Some(SessionState::IdentifiedStale)
    );

    world.inject_payload("bob", "#login bobby").await;
    assert!(world.server_saw("> SERVER MSG > bobby has logged in."));
    assert_eq!(world.driver().registry().identity(conn), Some("bobby"));
}

#[tokio::test]
async fn failed_delivery_does_not_stop_broadcast() {
    let mut world = SimWorld::new().await;
    for name in ["a", "b", "c"] {
        world.add_client(name, name).await;
    }
    world.fail_delivery("b");

    world.client_input("a", "ping").await;
    assert!(world.client_saw("a", "> From a > ping"));
    assert!(!world.client_saw("b", "> From a > ping"));
    assert!(world.client_saw("c", "> From a > ping"));

    let b = world.connection_of("b").unwrap();
    assert_eq!(
        world.driver().registry().session(b).map(|s| s.state()),
        Some(SessionState::IdentifiedStale)
    );
    // Client chat failures stay off the operator console
    assert!(!world.server_saw("Could not send message."));

    world.clear_output();
    world.operator_input("hi").await;
    assert!(world.client_saw("a", "> SERVER MSG > hi"));
    assert!(world.client_saw("c", "> SERVER MSG > hi"));
    assert_eq!(world.server_lines(), ["> SERVER MSG > hi", "Could not send message."]);
}

#[tokio::test]
async fn logoff_and_login_again() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;

    world.client_input("bob", "#logoff").await;
    assert!(world.client_saw("bob", "> The connection has been closed."));
    assert!(world.client_saw("bob", "Successfully disconnected from the server."));
    assert!(world.server_saw("bob has disconnected."));
    assert!(world.driver().registry().is_empty());

    world.client_input("bob", "#logoff").await;
    assert!(world.client_saw("bob", "There is no connection to terminate."));

    world.client_input("bob", "#login").await;
    assert!(world.client_saw("bob", "Successfully connected to the server."));
    assert_eq!(world.driver().registry().identified_count(), 1);
}

#[tokio::test]
async fn stop_keeps_connections_and_refuses_new_ones() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;

    world.operator_input("#stop").await;
    assert!(world.server_saw("Server has stopped listening for connections."));
    assert!(!world.is_listening());

    world.add_client("carol", "carol").await;
    assert_eq!(world.client_exit("carol"), Some(Exit::Failure));
    assert!(world.client_saw("carol", "Error: Can't setup connection! Terminating client."));

    world.operator_input("still open").await;
    assert!(world.client_saw("bob", "> SERVER MSG > still open"));

    world.operator_input("#start").await;
    assert!(world.is_listening());
    world.add_client("dave", "dave").await;
    assert!(world.client_saw("bob", "> SERVER MSG > dave has logged in."));
}

#[tokio::test]
async fn close_disconnects_everyone() {
    let mut world = SimWorld::new().await;
    world.add_client("alice", "alice").await;
    world.add_client("bob", "bob").await;

    world.operator_input("#close").await;
    assert!(!world.is_listening());
    assert!(world.driver().registry().is_empty());
    for name in ["alice", "bob"] {
        assert!(world.client_saw(name, "> The connection has been closed."));
        assert_eq!(world.client(name).map(|c| c.state()), Some(ConnectionState::Disconnected));
        assert_eq!(world.client_exit(name), None);
    }
    assert!(world.server_saw("alice has disconnected."));
    assert!(world.server_saw("bob has disconnected."));

    world.operator_input("#start").await;
    world.client_input("bob", "#login").await;
    assert!(world.client_saw("bob", "Successfully connected to the server."));
}

#[tokio::test]
async fn broken_connection_terminates_client() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;

    world.break_connection("bob").await;
    assert!(world.client_saw("bob", "> The connection has been shut down."));
    assert_eq!(world.client_exit("bob"), Some(Exit::Failure));
    assert!(world.server_saw("bob has disconnected."));
}

#[tokio::test]
async fn chat_after_server_close_terminates_client() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;
    world.operator_input("#close").await;

    world.client_input("bob", "hello?").await;
    assert!(world.client_saw("bob", "> Could not send message to server.  Terminating client."));
    assert_eq!(world.client_exit("bob"), Some(Exit::Failure));
}

#[tokio::test]
async fn quit_commands() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;

    world.client_input("bob", "#quit").await;
    assert_eq!(world.client_exit("bob"), Some(Exit::Success));
    assert!(world.client_saw("bob", "Terminating chat client..."));
    assert!(world.server_saw("bob has disconnected."));

    assert_eq!(world.operator_input("#quit").await, Flow::Shutdown);
    assert!(world.server_saw("Terminating server..."));
}

#[tokio::test]
async fn login_while_connected_terminates_client() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;

    world.client_input("bob", "#login").await;
    assert!(world.client_saw("bob", "Cannot login while connected."));
    assert_eq!(world.client_exit("bob"), Some(Exit::Failure));
    assert!(world.driver().registry().is_empty());
}

#[tokio::test]
async fn login_prefix_glued_to_text_is_chat() {
    let mut world = SimWorld::new().await;
    world.add_client("bob", "bob").await;
    let conn = world.connection_of("bob").unwrap();

    world.inject_payload("bob", "#loginfoo").await;
    assert!(world.client_saw("bob", "> From bob > #loginfoo"));
    assert_eq!(world.driver().registry().identity(conn), Some("bob"));
}
