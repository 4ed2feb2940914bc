//! Tokio TCP transport.
//!
//! An accept task hands new streams to the server loop as [`NetEvent`]s.
//! The loop attaches each stream: the read half moves into a per-connection
//! task that reports lines and the end of the stream, and the write half
//! moves into a writer task fed by a bounded queue. Sends only enqueue, so a
//! peer that stops reading fills its own queue and fails its own sends
//! without stalling the server loop. Events for connections that were already closed are
//! filtered out by [`TcpServerTransport::translate`], so the driver never
//! sees traffic after a close.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::StreamExt;
use linechat_core::{ConnectionId, ServerTransport, TransportError};
use tokio::{
    io::AsyncWriteExt,
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc::{self, error::TrySendError},
    task::{AbortHandle, JoinHandle},
};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::driver::ServerEvent;

/// Longest accepted inbound line, in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Outbound lines buffered per connection before sends start failing.
pub const OUTBOUND_QUEUE: usize = 32;

/// How long one write may stay blocked before the writer gives up.
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw notifications from the network tasks.
#[derive(Debug)]
pub enum NetEvent {
    /// The accept task produced a connection
    Accepted {
        /// Id assigned to the connection
        conn: ConnectionId,
        /// Accepted stream, not yet attached
        stream: TcpStream,
    },
    /// A line was read
    Payload {
        /// Source connection
        conn: ConnectionId,
        /// Line without terminator
        line: String,
    },
    /// The peer closed the stream
    Disconnected {
        /// Connection that ended
        conn: ConnectionId,
    },
    /// Reading failed, or the peer sent an over-long line
    Failed {
        /// Connection that failed
        conn: ConnectionId,
        /// Rendered I/O error
        error: String,
    },
}

struct Slot {
    outbound: mpsc::Sender<String>,
    reader: AbortHandle,
}

/// TCP implementation of [`ServerTransport`].
pub struct TcpServerTransport {
    bind_host: String,
    slots: HashMap<ConnectionId, Slot>,
    listener: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    next_id: Arc<AtomicU64>,
    events: mpsc::Sender<NetEvent>,
}

impl TcpServerTransport {
    /// Create a transport binding to `bind_host`, plus the receiver for
    /// its network events.
    pub fn new(bind_host: impl Into<String>) -> (Self, mpsc::Receiver<NetEvent>) {
        let (events, rx) = mpsc::channel(32);
        let transport = Self {
            bind_host: bind_host.into(),
            slots: HashMap::new(),
            listener: None,
            local_addr: None,
            next_id: Arc::new(AtomicU64::new(1)),
            events,
        };
        (transport, rx)
    }

    /// Address of the most recent listening socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Turn a network event into a driver event.
    ///
    /// Attaches accepted streams. Returns `None` for events about
    /// connections that are no longer open.
    pub fn translate(&mut self, event: NetEvent) -> Option<ServerEvent> {
        match event {
            NetEvent::Accepted { conn, stream } => {
                self.attach(conn, stream);
                Some(ServerEvent::ClientConnected { conn })
            },
            NetEvent::Payload { conn, line } => {
                self.slots.contains_key(&conn).then_some(ServerEvent::Payload { conn, line })
            },
            NetEvent::Disconnected { conn } => {
                self.detach(conn).then_some(ServerEvent::ClientDisconnected { conn })
            },
            NetEvent::Failed { conn, error } => {
                self.detach(conn).then_some(ServerEvent::ClientException { conn, error })
            },
        }
    }

    fn attach(&mut self, conn: ConnectionId, stream: TcpStream) {
        let (reader, writer) = stream.into_split();
        let task = tokio::spawn(read_lines(conn, reader, self.events.clone()));
        let (outbound, queue) = mpsc::channel(OUTBOUND_QUEUE);
        tokio::spawn(write_lines(conn, writer, queue));
        self.slots.insert(conn, Slot { outbound, reader: task.abort_handle() });
    }

    fn detach(&mut self, conn: ConnectionId) -> bool {
        self.slots.remove(&conn).is_some()
    }
}

impl ServerTransport for TcpServerTransport {
    async fn listen(&mut self, port: u16) -> Result<(), TransportError> {
        if self.listener.is_some() {
            return Ok(());
        }

        let listener = TcpListener::bind((self.bind_host.as_str(), port))
            .await
            .map_err(|e| TransportError::Listen(format!("{}:{port}: {e}", self.bind_host)))?;
        self.local_addr = listener.local_addr().ok();

        let task = tokio::spawn(accept_loop(listener, Arc::clone(&self.next_id), self.events.clone()));
        self.listener = Some(task);
        Ok(())
    }

    async fn stop_listening(&mut self) {
        let Some(task) = self.listener.take() else {
            return;
        };
        task.abort();
        // Wait for the socket to drop so the port can be bound again
        match task.await {
            Err(e) if !e.is_cancelled() => tracing::warn!("Accept task failed: {e}"),
            _ => {},
        }
    }

    fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    async fn send(&mut self, conn: ConnectionId, line: &str) -> Result<(), TransportError> {
        let slot = self.slots.get(&conn).ok_or(TransportError::UnknownConnection(conn))?;
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        slot.outbound.try_send(buf).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Send(format!("{conn} outbound queue full")),
            TrySendError::Closed(_) => TransportError::Send(format!("{conn} writer closed")),
        })
    }

    async fn close(&mut self, conn: ConnectionId) -> Result<(), TransportError> {
        // Dropping the queue lets the writer flush what is queued, then shut down
        let slot = self.slots.remove(&conn).ok_or(TransportError::UnknownConnection(conn))?;
        slot.reader.abort();
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    next_id: Arc<AtomicU64>,
    events: mpsc::Sender<NetEvent>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let conn = ConnectionId(next_id.fetch_add(1, Ordering::Relaxed));
                tracing::debug!("Accepted {conn} from {peer}");
                if events.send(NetEvent::Accepted { conn, stream }).await.is_err() {
                    break;
                }
            },
            Err(e) => tracing::warn!("Accept error: {e}"),
        }
    }
}

async fn read_lines(conn: ConnectionId, reader: OwnedReadHalf, events: mpsc::Sender<NetEvent>) {
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let last = loop {
        match lines.next().await {
            Some(Ok(line)) => {
                tracing::debug!("{conn} sent {} bytes", line.len());
                if events.send(NetEvent::Payload { conn, line }).await.is_err() {
                    return;
                }
            },
            None => break NetEvent::Disconnected { conn },
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                break NetEvent::Failed {
                    conn,
                    error: format!("line longer than {MAX_LINE_LENGTH} bytes"),
                };
            },
            Some(Err(LinesCodecError::Io(e))) => break NetEvent::Failed { conn, error: e.to_string() },
        }
    };

    if events.send(last).await.is_err() {
        tracing::debug!("Server loop gone before {conn} ended");
    }
}

async fn write_lines(conn: ConnectionId, mut writer: OwnedWriteHalf, mut queue: mpsc::Receiver<String>) {
    while let Some(line) = queue.recv().await {
        match tokio::time::timeout(WRITE_TIMEOUT, writer.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                tracing::debug!("Write to {conn} failed: {e}");
                return;
            },
            Err(_) => {
                tracing::debug!("Write to {conn} timed out");
                return;
            },
        }
    }

    if let Err(e) = writer.shutdown().await {
        tracing::debug!("Shutdown of {conn} failed: {e}");
    }
}
