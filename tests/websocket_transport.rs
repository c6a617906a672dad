//! WebSocket transport against a real local server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::Path;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;

use device_console::adapters::TungsteniteTransport;
use device_console::application::{
    ChannelSettings, DeviceTracker, RealtimeClient, RealtimeState,
};
use device_console::domain::device::{Device, DeviceStatus};
use device_console::domain::foundation::{
    BearerCredential, DeviceId, Session, UserId, UserIdentity,
};
use device_console::domain::realtime::ChannelStatus;
use device_console::ports::{InboundFrame, RealtimeTransport, TransportError};

const TOKEN: &str = "tok-alice";

async fn upgrade(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let expected = format!("Bearer {}", TOKEN);
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != expected {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| push_events(socket, user_id))
}

async fn push_events(mut socket: WebSocket, user_id: String) {
    let hello = json!({"action": "LOG", "device_id": "d1", "level": "event", "message": user_id});
    let _ = socket.send(Message::Text(hello.to_string())).await;
    let _ = socket
        .send(Message::Text(
            json!({"action": "CONNECTED", "device_id": "d1"}).to_string(),
        ))
        .await;
    let _ = socket.send(Message::Binary(vec![1, 2, 3])).await;
    let _ = socket.send(Message::Close(None)).await;
}

async fn start_server() -> SocketAddr {
    let app = Router::new().route("/api/user/ws/:user_id", get(upgrade));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

#[tokio::test]
async fn stream_delivers_text_then_binary_then_ends() {
    let addr = start_server().await;
    let transport = TungsteniteTransport::new(format!("ws://{}", addr));

    let mut stream = transport
        .connect(&alice(), &BearerCredential::new(TOKEN, "bearer"))
        .await
        .unwrap();

    let Some(Ok(InboundFrame::Text(first))) = stream.next_frame().await else {
        panic!("expected a text frame");
    };
    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(first["message"], "alice");

    assert!(matches!(stream.next_frame().await, Some(Ok(InboundFrame::Text(_)))));
    assert_eq!(
        stream.next_frame().await,
        Some(Ok(InboundFrame::Binary(vec![1, 2, 3])))
    );
    assert_eq!(stream.next_frame().await, None);
    assert!(stream.close().await.is_ok());
}

#[tokio::test]
async fn wrong_credential_is_refused() {
    let addr = start_server().await;
    let transport = TungsteniteTransport::new(format!("ws://{}", addr));

    let result = transport
        .connect(&alice(), &BearerCredential::new("stolen", "bearer"))
        .await;

    match result {
        Err(TransportError::Refused(reason)) => assert!(reason.contains("401"), "{}", reason),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("connection should be refused"),
    }
}

#[tokio::test]
async fn client_applies_events_from_real_socket() {
    let addr = start_server().await;
    let state = Arc::new(RealtimeState::default());
    let client = RealtimeClient::new(
        Arc::new(TungsteniteTransport::new(format!("ws://{}", addr))),
        Arc::clone(&state),
        ChannelSettings::default(),
    );
    let d1 = DeviceId::new("d1").unwrap();
    let mut tracker = DeviceTracker::fleet(Arc::clone(&state));
    tracker.load_snapshot(vec![Device::new(d1.clone(), "cam", "AA")]);

    let session = Session::new(
        UserIdentity::new(alice(), "Alice", "alice@example.com"),
        BearerCredential::new(TOKEN, "Bearer"),
    );
    client.init(&session).await;

    tokio::time::timeout(Duration::from_secs(5), tracker.changed())
        .await
        .expect("transition not received");
    tracker.drain();
    assert_eq!(tracker.device(&d1).unwrap().status, DeviceStatus::Connected);

    let mut status = client.subscribe_status();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| *s == ChannelStatus::Disconnected),
    )
    .await
    .expect("server close not observed")
    .unwrap();

    assert_eq!(state.logs(&d1).len(), 1);
    assert_eq!(state.latest_binary().map(|f| f.len()), Some(3));
    client.shutdown().await;
}
