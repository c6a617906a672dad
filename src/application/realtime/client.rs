//! Realtime channel client with explicit init and shutdown.
//!
//! At most one connection is live per client. Each `init` that opens a
//! connection bumps a generation counter; the connection task writes into
//! [`RealtimeState`] under that generation only, so nothing it receives
//! after `shutdown` (or after being replaced) reaches the sinks.
//!
//! Status goes `Connecting` as soon as `init` returns, `Connected` once the
//! handshake completes, `Error` on transport failure and `Disconnected` on
//! close or shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::foundation::{BearerCredential, ConnectionId, Session, UserId};
use crate::domain::realtime::ChannelStatus;
use crate::ports::{RealtimeTransport, TransportError, TransportStream};

use super::pipeline::process_frame;
use super::reconnect::ReconnectPolicy;
use super::state::RealtimeState;

/// Default bound on how long `shutdown` waits for the transport to close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection behaviour of a [`RealtimeClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    pub close_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// What `init` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A new connection task was started.
    Started(ConnectionId),
    /// A connection for the same user is already live.
    AlreadyActive(ConnectionId),
}

struct ActiveConnection {
    user_id: UserId,
    connection_id: ConnectionId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct RealtimeClient {
    transport: Arc<dyn RealtimeTransport>,
    state: Arc<RealtimeState>,
    settings: ChannelSettings,
    generation: AtomicU64,
    active: Mutex<Option<ActiveConnection>>,
}

impl RealtimeClient {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        state: Arc<RealtimeState>,
        settings: ChannelSettings,
    ) -> Self {
        Self {
            transport,
            state,
            settings,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<RealtimeState> {
        &self.state
    }

    pub fn status(&self) -> ChannelStatus {
        self.state.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ChannelStatus> {
        self.state.subscribe_status()
    }

    /// User the live connection belongs to, if any.
    pub async fn current_user(&self) -> Option<UserId> {
        self.active
            .lock()
            .await
            .as_ref()
            .filter(|conn| !conn.task.is_finished())
            .map(|conn| conn.user_id.clone())
    }

    /// Opens the realtime channel for `session`.
    ///
    /// With the same user already live this is a no-op. With a different
    /// user the prior connection is closed and the per-device buffers are
    /// cleared before the new connection starts.
    pub async fn init(&self, session: &Session) -> InitOutcome {
        let mut active = self.active.lock().await;

        if let Some(conn) = active.as_ref() {
            if conn.user_id == *session.user_id() && !conn.task.is_finished() {
                debug!(
                    user_id = %conn.user_id,
                    connection_id = %conn.connection_id,
                    "Realtime channel already active"
                );
                return InitOutcome::AlreadyActive(conn.connection_id);
            }
        }

        if let Some(previous) = active.take() {
            let switching_user = previous.user_id != *session.user_id();
            self.close(previous).await;
            if switching_user {
                self.state.clear_buffers();
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let connection_id = ConnectionId::new();
        let cancel = CancellationToken::new();

        self.state.begin(generation);
        self.state.set_status(generation, ChannelStatus::Connecting);

        info!(
            user_id = %session.user_id(),
            connection_id = %connection_id,
            generation,
            "Opening realtime channel"
        );

        let task = ConnectionTask {
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
            reconnect: self.settings.reconnect.clone(),
            generation,
            connection_id,
            user_id: session.user_id().clone(),
            credential: session.credential.clone(),
            cancel: cancel.clone(),
        };

        *active = Some(ActiveConnection {
            user_id: session.user_id().clone(),
            connection_id,
            cancel,
            task: tokio::spawn(task.run()),
        });

        InitOutcome::Started(connection_id)
    }

    /// Closes the channel and ends the session's sinks. Safe to call any
    /// number of times.
    ///
    /// Buffered images, logs and the legacy frame are dropped, so the next
    /// session never sees them. Returns once the transport is closed, or
    /// after `close_timeout` with the connection task aborted.
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        self.state.end();
        if let Some(conn) = active.take() {
            info!(
                user_id = %conn.user_id,
                connection_id = %conn.connection_id,
                "Closing realtime channel"
            );
            self.close(conn).await;
        }
        self.state.clear_buffers();
        self.state.publish_status(ChannelStatus::Disconnected);
    }

    async fn close(&self, conn: ActiveConnection) {
        self.state.end();
        conn.cancel.cancel();

        let mut task = conn.task;
        if tokio::time::timeout(self.settings.close_timeout, &mut task)
            .await
            .is_err()
        {
            warn!(
                connection_id = %conn.connection_id,
                timeout_ms = self.settings.close_timeout.as_millis() as u64,
                "Realtime channel did not close in time, aborting"
            );
            task.abort();
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.state.end();
        if let Some(conn) = self.active.get_mut().take() {
            conn.cancel.cancel();
        }
        self.state.publish_status(ChannelStatus::Disconnected);
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("settings", &self.settings)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("status", &self.state.status())
            .finish_non_exhaustive()
    }
}

// ============================================
// Connection task
// ============================================

enum StreamEnd {
    Cancelled,
    Closed,
    Failed(TransportError),
}

struct ConnectionTask {
    transport: Arc<dyn RealtimeTransport>,
    state: Arc<RealtimeState>,
    reconnect: ReconnectPolicy,
    generation: u64,
    connection_id: ConnectionId,
    user_id: UserId,
    credential: BearerCredential,
    cancel: CancellationToken,
}

impl ConnectionTask {
    async fn run(self) {
        let mut attempt: u32 = 0;

        loop {
            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.transport.connect(&self.user_id, &self.credential) => result,
            };

            match connected {
                Ok(mut stream) => {
                    attempt = 0;
                    if !self.state.set_status(self.generation, ChannelStatus::Connected) {
                        self.close_stream(stream.as_mut()).await;
                        return;
                    }
                    info!(connection_id = %self.connection_id, "Realtime channel connected");

                    match self.pump(stream.as_mut()).await {
                        StreamEnd::Cancelled => {
                            self.close_stream(stream.as_mut()).await;
                            return;
                        }
                        StreamEnd::Closed => {
                            info!(connection_id = %self.connection_id, "Realtime channel closed by server");
                            self.state
                                .set_status(self.generation, ChannelStatus::Disconnected);
                            return;
                        }
                        StreamEnd::Failed(error) => {
                            warn!(
                                connection_id = %self.connection_id,
                                error = %error,
                                "Realtime channel failed"
                            );
                            self.state.set_status(self.generation, ChannelStatus::Error);
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        connection_id = %self.connection_id,
                        error = %error,
                        attempt,
                        "Realtime connection attempt failed"
                    );
                    self.state.set_status(self.generation, ChannelStatus::Error);
                }
            }

            let Some(delay) = self.reconnect.next_delay(attempt) else {
                return;
            };
            attempt = attempt.saturating_add(1);
            info!(
                connection_id = %self.connection_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting realtime channel"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if !self.state.set_status(self.generation, ChannelStatus::Connecting) {
                return;
            }
        }
    }

    async fn pump(&self, stream: &mut dyn TransportStream) -> StreamEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return StreamEnd::Cancelled,
                next = stream.next_frame() => next,
            };

            match next {
                None => return StreamEnd::Closed,
                Some(Err(error)) => return StreamEnd::Failed(error),
                Some(Ok(frame)) => {
                    if !self.state.accepts(self.generation) {
                        return StreamEnd::Cancelled;
                    }
                    process_frame(&self.state, self.generation, frame).await;
                }
            }
        }
    }

    async fn close_stream(&self, stream: &mut dyn TransportStream) {
        if let Err(error) = stream.close().await {
            debug!(connection_id = %self.connection_id, error = %error, "Close after cancel failed");
        }
    }
}
