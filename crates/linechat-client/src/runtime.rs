//! Generic client runtime.
//!
//! Executes [`ChatClient`] actions against a [`ClientTransport`] and a
//! [`ChatDisplay`]. Outcomes of transport calls are fed straight back to
//! the client as events, ahead of any actions still queued.

use std::collections::VecDeque;

use linechat_core::{ChatDisplay, ClientTransport};

use crate::client::{ChatClient, ClientAction, ClientEvent, Exit};

/// Drives a [`ChatClient`] over a transport.
pub struct ClientRuntime<T, D> {
    client: ChatClient,
    transport: T,
    display: D,
}

impl<T, D> ClientRuntime<T, D>
where
    T: ClientTransport,
    D: ChatDisplay,
{
    /// Create a runtime. Nothing happens until [`start`](Self::start).
    pub fn new(client: ChatClient, transport: T, display: D) -> Self {
        Self { client, transport, display }
    }

    /// Make the initial connection.
    ///
    /// Returns `Some` if the client terminated.
    pub async fn start(&mut self) -> Option<Exit> {
        let actions = self.client.start();
        self.execute(actions).await
    }

    /// Process one event. Returns `Some` if the client terminated.
    pub async fn dispatch(&mut self, event: ClientEvent) -> Option<Exit> {
        let actions = self.client.process_event(event);
        self.execute(actions).await
    }

    /// Close the connection if one is open, swallowing errors.
    pub async fn shutdown(&mut self) {
        if !self.transport.is_connected() {
            return;
        }
        if let Err(e) = self.transport.close().await {
            tracing::debug!("Ignoring close error during shutdown: {e}");
        }
    }

    async fn execute(&mut self, actions: Vec<ClientAction>) -> Option<Exit> {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                ClientAction::Connect { host, port } => {
                    let event = match self.transport.open(&host, port).await {
                        Ok(()) => {
                            tracing::info!("Connected to {host}:{port}");
                            ClientEvent::Established
                        },
                        Err(e) => {
                            tracing::warn!("Connect to {host}:{port} failed: {e}");
                            ClientEvent::ConnectFailed { error: e.to_string() }
                        },
                    };
                    self.feed_front(&mut queue, event);
                },
                ClientAction::Send { line, kind } => {
                    if let Err(e) = self.transport.send(&line).await {
                        tracing::warn!("Send failed: {e}");
                        // Nothing queued after a failed send may run
                        queue.clear();
                        queue.extend(
                            self.client
                                .process_event(ClientEvent::SendFailed { kind, error: e.to_string() }),
                        );
                    }
                },
                ClientAction::Disconnect => match self.transport.close().await {
                    Ok(()) => self.feed_front(&mut queue, ClientEvent::Closed),
                    Err(e) => tracing::debug!("Disconnect ignored: {e}"),
                },
                ClientAction::Display(line) => self.display.display(&line),
                ClientAction::Quit(exit) => {
                    self.shutdown().await;
                    tracing::info!("Client exiting ({exit:?})");
                    return Some(exit);
                },
            }
        }

        None
    }

    fn feed_front(&mut self, queue: &mut VecDeque<ClientAction>, event: ClientEvent) {
        for action in self.client.process_event(event).into_iter().rev() {
            queue.push_front(action);
        }
    }

    /// Client state machine (for inspection).
    pub fn client(&self) -> &ChatClient {
        &self.client
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
