//! In-memory realtime transport for tests.
//!
//! Every `connect` call parks as a [`PendingConnection`] until the test
//! accepts or refuses it, so intermediate channel states are observable.
//! An accepted connection hands back a [`ServerHandle`] that plays the
//! server side of the socket.
//!
//! ```text
//!   client ── connect() ──▶ PendingConnection ── accept() ──▶ ServerHandle
//!      ▲                                                          │
//!      └──────────── InMemoryStream ◀── send_text / fail / close ─┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch, Mutex};

use crate::domain::foundation::{BearerCredential, UserId};
use crate::ports::{InboundFrame, RealtimeTransport, TransportError, TransportStream};

#[derive(Debug, Default)]
struct Counters {
    open: AtomicUsize,
    max_open: AtomicUsize,
    attempts: AtomicUsize,
}

/// Transport whose server side is driven by the test.
pub struct InMemoryTransport {
    requests_tx: mpsc::UnboundedSender<PendingConnection>,
    requests_rx: Mutex<mpsc::UnboundedReceiver<PendingConnection>>,
    counters: Arc<Counters>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        Self {
            requests_tx,
            requests_rx: Mutex::new(requests_rx),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Waits for the next connection attempt.
    pub async fn next_connection(&self) -> Option<PendingConnection> {
        self.requests_rx.lock().await.recv().await
    }

    /// Waits for the next connection attempt and accepts it.
    pub async fn accept_next(&self) -> Option<ServerHandle> {
        self.next_connection().await.map(PendingConnection::accept)
    }

    /// Connections currently open from the client's point of view.
    pub fn open_connections(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open connections ever observed.
    pub fn max_open_connections(&self) -> usize {
        self.counters.max_open.load(Ordering::SeqCst)
    }

    pub fn connect_attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeTransport for InMemoryTransport {
    async fn connect(
        &self,
        user_id: &UserId,
        credential: &BearerCredential,
    ) -> Result<Box<dyn TransportStream>, TransportError> {
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);

        let (reply, outcome) = oneshot::channel();
        let pending = PendingConnection {
            user_id: user_id.clone(),
            authorization: credential.authorization_header(),
            reply,
            counters: Arc::clone(&self.counters),
        };
        self.requests_tx
            .send(pending)
            .map_err(|_| TransportError::Refused("transport dropped".to_string()))?;

        outcome
            .await
            .map_err(|_| TransportError::Refused("connection abandoned".to_string()))?
    }
}

/// A connection attempt awaiting the test's decision.
pub struct PendingConnection {
    pub user_id: UserId,
    /// The `Authorization` value the client presented.
    pub authorization: String,
    reply: oneshot::Sender<Result<Box<dyn TransportStream>, TransportError>>,
    counters: Arc<Counters>,
}

impl PendingConnection {
    /// Completes the handshake.
    pub fn accept(self) -> ServerHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_open.fetch_max(open, Ordering::SeqCst);

        let stream = InMemoryStream {
            events: events_rx,
            guard: Some(OpenGuard {
                counters: Arc::clone(&self.counters),
                closed_tx,
            }),
        };
        // If the client stopped waiting, the stream drops here and the
        // connection counts as closed immediately.
        let _ = self.reply.send(Ok(Box::new(stream)));

        ServerHandle {
            user_id: self.user_id,
            events: events_tx,
            closed_rx,
        }
    }

    /// Rejects the handshake.
    pub fn refuse(self, reason: impl Into<String>) {
        let _ = self.reply.send(Err(TransportError::Refused(reason.into())));
    }
}

enum ServerEvent {
    Frame(InboundFrame),
    Fail(TransportError),
    Close,
}

/// Server side of one accepted connection.
pub struct ServerHandle {
    pub user_id: UserId,
    events: mpsc::UnboundedSender<ServerEvent>,
    closed_rx: watch::Receiver<bool>,
}

impl ServerHandle {
    /// Pushes a text frame. Returns `false` if the client side is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.push(ServerEvent::Frame(InboundFrame::Text(text.into())))
    }

    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send_text(value.to_string())
    }

    pub fn send_binary(&self, data: impl Into<Vec<u8>>) -> bool {
        self.push(ServerEvent::Frame(InboundFrame::Binary(data.into())))
    }

    /// Breaks the connection with a transport error.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.push(ServerEvent::Fail(TransportError::ConnectionLost(reason.into())))
    }

    /// Closes the connection cleanly from the server side.
    pub fn close(&self) -> bool {
        self.push(ServerEvent::Close)
    }

    /// True once the client closed or dropped its stream.
    pub fn is_client_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Waits until the client closed or dropped its stream.
    pub async fn client_closed(&self) {
        let mut rx = self.closed_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    fn push(&self, event: ServerEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

struct OpenGuard {
    counters: Arc<Counters>,
    closed_tx: watch::Sender<bool>,
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
        self.closed_tx.send_replace(true);
    }
}

struct InMemoryStream {
    events: mpsc::UnboundedReceiver<ServerEvent>,
    guard: Option<OpenGuard>,
}

#[async_trait]
impl TransportStream for InMemoryStream {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        self.guard.as_ref()?;

        match self.events.recv().await {
            Some(ServerEvent::Frame(frame)) => Some(Ok(frame)),
            Some(ServerEvent::Fail(error)) => {
                self.guard = None;
                Some(Err(error))
            }
            Some(ServerEvent::Close) | None => {
                self.guard = None;
                None
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.guard = None;
        Ok(())
    }
}
