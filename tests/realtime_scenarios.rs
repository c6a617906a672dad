//! End-to-end scenarios for the realtime channel.
//!
//! Each test wires the real application objects (session provider, realtime
//! client, trackers, viewers) to the in-memory transport and plays the
//! server side by hand.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;
use secrecy::Secret;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use device_console::adapters::{
    InMemoryCredentialStore, InMemoryFrameDisplay, InMemoryTransport, MockAuthApi,
};
use device_console::application::{
    spawn_session_binding, ChannelSettings, DeviceCommandHandler, DeviceTracker, InferenceViewer,
    RealtimeClient, RealtimeState, SessionProvider,
};
use device_console::domain::device::{BusyReason, Device, DeviceStatus, OperationMode};
use device_console::domain::foundation::{
    BearerCredential, DeviceId, FirmwareId, ModelId, Session, UserId, UserIdentity,
};
use device_console::domain::realtime::ChannelStatus;
use device_console::ports::{
    ApiError, ApiResponse, ApiResult, Deployment, DeviceApi, FrameDisplay, RealtimeTransport,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Accepts every command except jobs for the devices in `offline`.
#[derive(Default)]
struct AcceptingDeviceApi {
    offline: Vec<DeviceId>,
}

impl AcceptingDeviceApi {
    fn with_offline(device_id: DeviceId) -> Self {
        Self {
            offline: vec![device_id],
        }
    }

    fn deploy(&self, device_ids: &[DeviceId]) -> Deployment {
        let mut deployment = Deployment::default();
        for device_id in device_ids {
            if self.offline.contains(device_id) {
                deployment.reject(
                    device_id.clone(),
                    ApiError::new("DEVICE_OFFLINE", "Device is offline"),
                );
            } else {
                deployment.accept(device_id.clone());
            }
        }
        deployment
    }
}

#[async_trait]
impl DeviceApi for AcceptingDeviceApi {
    async fn list(&self) -> ApiResult<Vec<Device>> {
        Ok(ApiResponse::new("ok", Vec::new()))
    }

    async fn get(&self, device_id: &DeviceId) -> ApiResult<Device> {
        Ok(ApiResponse::new("ok", Device::new(device_id.clone(), "", "")))
    }

    async fn delete_many(&self, _device_ids: &[DeviceId]) -> ApiResult<()> {
        Ok(ApiResponse::new("ok", ()))
    }

    async fn pair(&self, _ssid: &str, _password: &Secret<String>) -> ApiResult<()> {
        Ok(ApiResponse::new("ok", ()))
    }

    async fn switch_mode(&self, _device_id: &DeviceId, _mode: OperationMode) -> ApiResult<()> {
        Ok(ApiResponse::new("ok", ()))
    }

    async fn restart(&self, _device_id: &DeviceId) -> ApiResult<()> {
        Ok(ApiResponse::new("ok", ()))
    }

    async fn run_inference(&self, _device_id: &DeviceId) -> ApiResult<()> {
        Ok(ApiResponse::new("ok", ()))
    }

    async fn deploy_firmware(
        &self,
        device_ids: &[DeviceId],
        _firmware_id: &FirmwareId,
    ) -> Deployment {
        self.deploy(device_ids)
    }

    async fn deploy_model(&self, device_ids: &[DeviceId], _model_id: &ModelId) -> Deployment {
        self.deploy(device_ids)
    }

    async fn switch_model(&self, _device_id: &DeviceId, _model_id: &ModelId) -> ApiResult<()> {
        Ok(ApiResponse::new("ok", ()))
    }
}

struct Harness {
    transport: Arc<InMemoryTransport>,
    state: Arc<RealtimeState>,
    client: Arc<RealtimeClient>,
}

impl Harness {
    fn new() -> Self {
        let transport = Arc::new(InMemoryTransport::new());
        let state = Arc::new(RealtimeState::default());
        let client = Arc::new(RealtimeClient::new(
            Arc::clone(&transport) as Arc<dyn RealtimeTransport>,
            Arc::clone(&state),
            ChannelSettings::default(),
        ));
        Self {
            transport,
            state,
            client,
        }
    }
}

fn id(s: &str) -> DeviceId {
    DeviceId::new(s).unwrap()
}

fn session(user: &str) -> Session {
    Session::new(
        UserIdentity::new(UserId::new(user).unwrap(), user, format!("{}@example.com", user)),
        BearerCredential::new(format!("tok-{}", user), "bearer"),
    )
}

fn connected(s: &str) -> Device {
    Device::new(id(s), s, "AA:BB:CC").with_status(DeviceStatus::Connected)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn wait_for_status(client: &RealtimeClient, status: ChannelStatus) {
    let mut rx = client.subscribe_status();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == status))
        .await
        .expect("status not reached in time")
        .expect("status channel closed");
}

/// Drains until `count` transitions have been applied.
async fn drain_exactly(tracker: &mut DeviceTracker, count: usize) {
    let mut applied = 0;
    while applied < count {
        tokio::time::timeout(Duration::from_secs(5), tracker.changed())
            .await
            .expect("transition not received in time");
        applied += tracker.drain().len();
    }
    assert_eq!(applied, count);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn scenario_a_session_drives_connection_and_first_transition() {
    let h = Harness::new();
    let auth = MockAuthApi::new().with_test_user("alice", "secret", "tok-alice");
    let sessions = SessionProvider::new(Arc::new(auth), Arc::new(InMemoryCredentialStore::new()));
    let mut tracker = DeviceTracker::fleet(Arc::clone(&h.state));
    tracker.load_snapshot(vec![Device::new(id("d1"), "cam", "AA")]);

    let binding = spawn_session_binding(Arc::clone(&h.client), sessions.subscribe());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.client.status(), ChannelStatus::Disconnected);
    assert_eq!(h.transport.connect_attempts(), 0);

    sessions
        .login("alice", &Secret::new("secret".to_string()))
        .await
        .unwrap();

    let pending = h.transport.next_connection().await.unwrap();
    assert_eq!(h.client.status(), ChannelStatus::Connecting);
    assert_eq!(pending.user_id.as_str(), "alice");
    assert_eq!(pending.authorization, "Bearer tok-alice");

    let server = pending.accept();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    server.send_json(&json!({"action": "CONNECTED", "device_id": "d1"}));
    drain_exactly(&mut tracker, 1).await;
    assert_eq!(tracker.device(&id("d1")).unwrap().status, DeviceStatus::Connected);

    sessions.logout().await.unwrap();
    server.client_closed().await;
    wait_for_status(&h.client, ChannelStatus::Disconnected).await;
    assert_eq!(h.transport.open_connections(), 0);
    binding.abort();
}

#[tokio::test]
async fn scenario_b_ota_round_trip_clears_busy_reason() {
    let h = Harness::new();
    let mut tracker = DeviceTracker::fleet(Arc::clone(&h.state));
    tracker.load_snapshot(vec![connected("d1")]);
    let commands = DeviceCommandHandler::new(Arc::new(AcceptingDeviceApi::default()));

    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    commands
        .update_firmware(&mut tracker, &[id("d1")], &FirmwareId::new("fw-v2").unwrap())
        .await
        .unwrap();
    let d1 = tracker.device(&id("d1")).unwrap();
    assert_eq!(d1.status, DeviceStatus::Busy);
    assert_eq!(d1.busy_reason, Some(BusyReason::Ota));

    server.send_json(&json!({"action": "OTA", "device_id": "d1", "status": "RECEIVED"}));
    drain_exactly(&mut tracker, 1).await;
    assert_eq!(tracker.device(&id("d1")).unwrap().status, DeviceStatus::Busy);
    assert_eq!(
        tracker.device(&id("d1")).unwrap().busy_reason,
        Some(BusyReason::Ota)
    );

    server.send_json(&json!({
        "action": "OTA",
        "device_id": "d1",
        "status": "COMPLETED",
        "firmware_name": "v2"
    }));
    drain_exactly(&mut tracker, 1).await;

    let d1 = tracker.device(&id("d1")).unwrap();
    assert_eq!(d1.status, DeviceStatus::Connected);
    assert_eq!(d1.firmware_name.as_deref(), Some("v2"));
    assert!(d1.busy_reason.is_none());

    h.client.shutdown().await;
}

#[tokio::test]
async fn partially_refused_ota_still_completes_on_accepting_device() {
    let h = Harness::new();
    let mut tracker = DeviceTracker::fleet(Arc::clone(&h.state));
    tracker.load_snapshot(vec![
        Device {
            firmware_name: Some("v1".to_string()),
            ..connected("d1")
        },
        connected("d2"),
    ]);
    let commands = DeviceCommandHandler::new(Arc::new(AcceptingDeviceApi::with_offline(id("d2"))));

    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    let err = commands
        .update_firmware(&mut tracker, &[id("d1"), id("d2")], &FirmwareId::new("fw-v2").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DEVICE_OFFLINE");
    assert_eq!(tracker.device(&id("d1")).unwrap().busy_reason, Some(BusyReason::Ota));
    assert!(tracker.device(&id("d2")).unwrap().busy_reason.is_none());

    server.send_json(&json!({"action": "OTA", "device_id": "d1", "status": "RECEIVED"}));
    server.send_json(&json!({
        "action": "OTA",
        "device_id": "d1",
        "status": "COMPLETED",
        "firmware_name": "v2"
    }));
    drain_exactly(&mut tracker, 2).await;

    let d1 = tracker.device(&id("d1")).unwrap();
    assert_eq!(d1.status, DeviceStatus::Connected);
    assert_eq!(d1.firmware_name.as_deref(), Some("v2"));
    assert!(d1.busy_reason.is_none());
    assert_eq!(tracker.device(&id("d2")).unwrap().status, DeviceStatus::Connected);

    h.client.shutdown().await;
}

#[tokio::test]
async fn scenario_c_image_buffer_keeps_newest_hundred() {
    let h = Harness::new();
    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    let mut arrivals = h.state.subscribe_images();
    for i in 1..=150 {
        server.send_json(&json!({
            "action": "INFERENCE_RESULT",
            "device_id": "d2",
            "image_data": Base64.encode(format!("frame-{}", i)),
        }));
    }
    tokio::time::timeout(Duration::from_secs(5), arrivals.wait_for(|n| *n == 150))
        .await
        .expect("frames not processed in time")
        .unwrap();

    assert_eq!(h.state.image_count(&id("d2")), 100);
    let head = h.state.pop_image(&id("d2")).unwrap();
    assert_eq!(head.sequence, 51);
    assert_eq!(&*head.data, b"frame-51");

    h.client.shutdown().await;
}

// =============================================================================
// Connection lifecycle
// =============================================================================

#[tokio::test]
async fn never_more_than_one_open_connection() {
    let h = Harness::new();

    h.client.init(&session("alice")).await;
    let _first = h.transport.accept_next().await.unwrap();
    h.client.init(&session("alice")).await;
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    h.client.init(&session("bob")).await;
    let second = h.transport.accept_next().await.unwrap();
    assert_eq!(second.user_id.as_str(), "bob");
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    assert_eq!(h.transport.connect_attempts(), 2);
    assert_eq!(h.transport.max_open_connections(), 1);
    assert_eq!(h.transport.open_connections(), 1);

    h.client.shutdown().await;
    h.client.shutdown().await;
    assert_eq!(h.transport.open_connections(), 0);
    assert_eq!(h.client.status(), ChannelStatus::Disconnected);
}

#[tokio::test]
async fn shutdown_before_init_is_noop() {
    let h = Harness::new();
    h.client.shutdown().await;
    h.client.shutdown().await;
    assert_eq!(h.client.status(), ChannelStatus::Disconnected);
    assert_eq!(h.transport.connect_attempts(), 0);
}

#[tokio::test]
async fn shutdown_during_handshake_abandons_connection() {
    let h = Harness::new();
    h.client.init(&session("alice")).await;
    let pending = h.transport.next_connection().await.unwrap();

    h.client.shutdown().await;
    let server = pending.accept();

    assert!(server.is_client_closed());
    assert_eq!(h.transport.open_connections(), 0);
    assert_eq!(h.client.status(), ChannelStatus::Disconnected);
}

#[tokio::test]
async fn nothing_is_recorded_after_shutdown() {
    let h = Harness::new();
    let mut tracker = DeviceTracker::fleet(Arc::clone(&h.state));
    tracker.load_snapshot(vec![connected("d1")]);

    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;
    h.client.shutdown().await;

    let delivered = server.send_json(&json!({"action": "DISCONNECTED", "device_id": "d1"}));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(!delivered);
    assert_eq!(tracker.pending(), 0);
    assert_eq!(tracker.device(&id("d1")).unwrap().status, DeviceStatus::Connected);
}

#[tokio::test]
async fn switching_user_clears_per_device_buffers() {
    let h = Harness::new();
    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    server.send_json(&json!({"action": "LOG", "device_id": "d1", "level": "info", "message": "boot"}));
    wait_until(|| !h.state.logs(&id("d1")).is_empty()).await;

    h.client.init(&session("bob")).await;
    assert!(h.state.logs(&id("d1")).is_empty());
    h.client.shutdown().await;
}

#[tokio::test]
async fn logout_then_login_as_other_user_starts_with_empty_buffers() {
    let h = Harness::new();
    let auth = MockAuthApi::new()
        .with_test_user("alice", "a-pass", "tok-alice")
        .with_test_user("bob", "b-pass", "tok-bob");
    let sessions = SessionProvider::new(Arc::new(auth), Arc::new(InMemoryCredentialStore::new()));
    let binding = spawn_session_binding(Arc::clone(&h.client), sessions.subscribe());

    sessions
        .login("alice", &Secret::new("a-pass".to_string()))
        .await
        .unwrap();
    let alice = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    alice.send_json(&json!({
        "action": "LOG",
        "device_id": "d1",
        "level": "info",
        "message": "alice-private-log"
    }));
    alice.send_json(&json!({
        "action": "INFERENCE_RESULT",
        "device_id": "d1",
        "image_data": Base64.encode(b"alice-frame")
    }));
    alice.send_binary(vec![9u8, 9]);
    wait_until(|| {
        !h.state.logs(&id("d1")).is_empty()
            && h.state.image_count(&id("d1")) == 1
            && h.state.latest_binary().is_some()
    })
    .await;

    sessions.logout().await.unwrap();
    alice.client_closed().await;
    wait_for_status(&h.client, ChannelStatus::Disconnected).await;
    assert!(h.state.logs(&id("d1")).is_empty());
    assert_eq!(h.state.image_count(&id("d1")), 0);
    assert!(h.state.latest_binary().is_none());

    sessions
        .login("bob", &Secret::new("b-pass".to_string()))
        .await
        .unwrap();
    let bob = h.transport.accept_next().await.unwrap();
    assert_eq!(bob.user_id.as_str(), "bob");
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    assert!(h.state.logs(&id("d1")).is_empty());
    assert_eq!(h.state.image_count(&id("d1")), 0);
    assert!(h.state.latest_binary().is_none());

    binding.abort();
    h.client.shutdown().await;
}

// =============================================================================
// Frame handling
// =============================================================================

#[tokio::test]
async fn bad_frames_do_not_stop_the_channel() {
    let h = Harness::new();
    let mut tracker = DeviceTracker::fleet(Arc::clone(&h.state));
    tracker.load_snapshot(vec![Device::new(id("d1"), "cam", "AA")]);

    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    server.send_text("{not json");
    server.send_json(&json!({"action": "SELF_DESTRUCT", "device_id": "d1"}));
    server.send_json(&json!({"action": "INFERENCE_RESULT", "device_id": "d1", "image_data": "***"}));
    server.send_json(&json!({"action": "CONNECTED", "device_id": "d1"}));

    drain_exactly(&mut tracker, 1).await;
    assert_eq!(tracker.device(&id("d1")).unwrap().status, DeviceStatus::Connected);
    assert_eq!(h.state.image_count(&id("d1")), 0);
    assert_eq!(h.client.status(), ChannelStatus::Connected);
    h.client.shutdown().await;
}

#[tokio::test]
async fn transition_for_unknown_device_is_ignored() {
    let h = Harness::new();
    let mut tracker = DeviceTracker::fleet(Arc::clone(&h.state));
    tracker.load_snapshot(vec![connected("d1")]);

    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    server.send_json(&json!({"action": "DISCONNECTED", "device_id": "ghost"}));
    drain_exactly(&mut tracker, 1).await;

    assert_eq!(tracker.devices().len(), 1);
    assert!(tracker.device(&id("ghost")).is_none());
    h.client.shutdown().await;
}

#[tokio::test]
async fn list_and_detail_trackers_both_see_transitions() {
    let h = Harness::new();
    let mut list = DeviceTracker::fleet(Arc::clone(&h.state));
    list.load_snapshot(vec![connected("d1"), connected("d2")]);

    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    server.send_json(&json!({"action": "DISCONNECTED", "device_id": "d1"}));
    drain_exactly(&mut list, 1).await;

    // A detail view mounted later only sees what arrives after it.
    let mut detail = DeviceTracker::for_device(Arc::clone(&h.state), id("d2"));
    detail.load_snapshot(vec![connected("d1"), connected("d2")]);

    server.send_json(&json!({"action": "MODE_SWITCH", "device_id": "d2", "status": "RECEIVED"}));
    drain_exactly(&mut list, 1).await;
    drain_exactly(&mut detail, 1).await;

    assert_eq!(list.device(&id("d1")).unwrap().status, DeviceStatus::Disconnected);
    assert_eq!(list.device(&id("d2")).unwrap().status, DeviceStatus::Busy);
    assert_eq!(detail.device(&id("d2")).unwrap().status, DeviceStatus::Busy);
    h.client.shutdown().await;
}

#[tokio::test]
async fn inference_viewer_releases_every_handle_once() {
    let h = Harness::new();
    let display = Arc::new(InMemoryFrameDisplay::new());
    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    let mut viewer = InferenceViewer::for_device(
        Arc::clone(&h.state),
        Arc::clone(&display) as Arc<dyn FrameDisplay>,
        id("d2"),
    );
    for i in 0..5 {
        server.send_json(&json!({
            "action": "INFERENCE_RESULT",
            "device_id": "d2",
            "image_data": Base64.encode([i as u8; 4]),
        }));
    }
    wait_until(|| h.state.image_count(&id("d2")) == 5).await;

    while viewer.show_next().unwrap().is_some() {
        assert_eq!(display.live_handles(), 1);
    }
    drop(viewer);

    assert_eq!(display.created_count(), 5);
    assert_eq!(display.released_count(), 5);
    assert_eq!(display.live_handles(), 0);
    assert_eq!(display.double_releases(), 0);
    h.client.shutdown().await;
}

#[tokio::test]
async fn raw_binary_frames_fill_latest_slot() {
    let h = Harness::new();
    h.client.init(&session("alice")).await;
    let server = h.transport.accept_next().await.unwrap();
    wait_for_status(&h.client, ChannelStatus::Connected).await;

    server.send_binary(vec![1, 2, 3]);
    server.send_binary(vec![4, 5]);
    wait_until(|| h.state.latest_binary().map(|f| f.sequence) == Some(2)).await;

    assert_eq!(&*h.state.latest_binary().unwrap().data, &[4, 5]);
    h.client.shutdown().await;
}
