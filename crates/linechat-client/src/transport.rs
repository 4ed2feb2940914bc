//! Tokio TCP transport for the client.
//!
//! Provides [`TcpClientTransport`], a thin layer that opens one TCP
//! connection, writes lines, and reports received lines and the end of the
//! stream as [`TransportEvent`]s. Protocol logic remains in the sans-IO
//! [`ChatClient`](crate::ChatClient).

use linechat_core::{ClientTransport, TransportError};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
    task::JoinHandle,
};

use crate::client::ClientEvent;

/// A notification from the reader task, tagged with the connection it
/// belongs to.
#[derive(Debug)]
pub struct TransportEvent {
    generation: u64,
    event: ClientEvent,
}

struct ActiveConnection {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

/// TCP implementation of [`ClientTransport`].
pub struct TcpClientTransport {
    active: Option<ActiveConnection>,
    generation: u64,
    events: mpsc::Sender<TransportEvent>,
}

impl TcpClientTransport {
    /// Create a disconnected transport, plus the receiver for its events.
    pub fn new() -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events, rx) = mpsc::channel(32);
        (Self { active: None, generation: 0, events }, rx)
    }

    /// Accept an event from the reader task.
    ///
    /// Returns `None` for events from a connection that was already closed
    /// locally. When the stream ended, the connection is dropped.
    pub fn acknowledge(&mut self, event: TransportEvent) -> Option<ClientEvent> {
        if self.active.is_none() || event.generation != self.generation {
            return None;
        }
        if matches!(event.event, ClientEvent::Closed | ClientEvent::Exception { .. }) {
            self.active = None;
        }
        Some(event.event)
    }
}

impl ClientTransport for TcpClientTransport {
    async fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        if self.active.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| TransportError::Connection(format!("{host}:{port}: {e}")))?;

        self.generation += 1;
        let (reader, writer) = stream.into_split();
        let reader = tokio::spawn(read_lines(self.generation, reader, self.events.clone()));
        self.active = Some(ActiveConnection { writer, reader });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let mut active = self.active.take().ok_or(TransportError::NotConnected)?;
        let shutdown = active.writer.shutdown().await;

        active.reader.abort();
        // Disconnection is confirmed once the reader is gone
        match active.reader.await {
            Err(e) if !e.is_cancelled() => tracing::warn!("Reader task failed: {e}"),
            _ => {},
        }

        shutdown.map_err(TransportError::from)
    }

    async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        let active = self.active.as_mut().ok_or(TransportError::NotConnected)?;
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        active.writer.write_all(buf.as_bytes()).await.map_err(|e| TransportError::Send(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.active.is_some()
    }
}

async fn read_lines(generation: u64, reader: OwnedReadHalf, events: mpsc::Sender<TransportEvent>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => ClientEvent::LineReceived(line),
            Ok(None) => ClientEvent::Closed,
            Err(e) => ClientEvent::Exception { error: e.to_string() },
        };
        let last = !matches!(event, ClientEvent::LineReceived(_));
        if events.send(TransportEvent { generation, event }).await.is_err() || last {
            return;
        }
    }
}
