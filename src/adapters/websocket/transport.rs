//! WebSocket realtime transport over tokio-tungstenite.
//!
//! Connects to `<ws_base>/api/user/ws/<user_id>` and presents the bearer
//! credential as an `Authorization` header during the upgrade.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::domain::foundation::{BearerCredential, UserId};
use crate::ports::{InboundFrame, RealtimeTransport, TransportError, TransportStream};

/// Realtime transport backed by a WebSocket client.
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    ws_base_url: String,
}

impl TungsteniteTransport {
    /// `ws_base_url` is the scheme and authority, e.g. `wss://api.example.com`.
    pub fn new(ws_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
        }
    }

    pub fn endpoint(&self, user_id: &UserId) -> String {
        format!(
            "{}/api/user/ws/{}",
            self.ws_base_url.trim_end_matches('/'),
            user_id
        )
    }
}

#[async_trait]
impl RealtimeTransport for TungsteniteTransport {
    async fn connect(
        &self,
        user_id: &UserId,
        credential: &BearerCredential,
    ) -> Result<Box<dyn TransportStream>, TransportError> {
        let endpoint = self.endpoint(user_id);

        let mut request = endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;
        let header = HeaderValue::from_str(&credential.authorization_header())
            .map_err(|e| TransportError::InvalidEndpoint(format!("authorization header: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, header);

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| match e {
                WsError::Http(response) => {
                    TransportError::Refused(format!("HTTP {}", response.status()))
                }
                other => TransportError::Refused(other.to_string()),
            })?;

        tracing::debug!(user_id = %user_id, endpoint = %endpoint, "WebSocket handshake completed");

        Ok(Box::new(TungsteniteStream {
            socket,
            closed: false,
        }))
    }
}

struct TungsteniteStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl TransportStream for TungsteniteStream {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        if self.closed {
            return None;
        }

        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(InboundFrame::Text(text))),
                Some(Ok(Message::Binary(data))) => return Some(Ok(InboundFrame::Binary(data))),
                Some(Ok(Message::Close(_))) | None => {
                    self.closed = true;
                    return None;
                }
                // Pings are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    self.closed = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(TransportError::ConnectionLost(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.socket.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::ConnectionLost(e.to_string())),
        }
    }
}
