//! `device-console` - headless monitor.
//!
//! Restores (or establishes) a session, opens the realtime channel and logs
//! every device lifecycle change until Ctrl-C.

use std::error::Error;
use std::sync::Arc;

use tracing::{debug, info, warn};

use device_console::adapters::{FileCredentialStore, HttpBackendClient, TungsteniteTransport};
use device_console::application::{
    spawn_session_binding, DeviceTracker, RealtimeClient, RealtimeState, SessionProvider,
};
use device_console::config::AppConfig;
use device_console::domain::foundation::{AuthError, Session};
use device_console::ports::{AuthApi, CredentialStore, DeviceApi, RealtimeTransport};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.logging.init();
    config.validate()?;

    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(&config.credentials.path));
    let backend = Arc::new(HttpBackendClient::new(
        config.backend.base_url.clone(),
        config.backend.request_timeout(),
        Arc::clone(&store),
    )?);
    let sessions = SessionProvider::new(Arc::clone(&backend) as Arc<dyn AuthApi>, store);

    let session = establish_session(&sessions, &config).await?;
    info!(user_id = %session.user_id(), name = %session.identity.name, "Session ready");

    let state = Arc::new(RealtimeState::new(config.realtime.sink_limits()));
    let transport: Arc<dyn RealtimeTransport> =
        Arc::new(TungsteniteTransport::new(config.backend.realtime_base_url()));
    let client = Arc::new(RealtimeClient::new(
        transport,
        Arc::clone(&state),
        config.realtime.channel_settings(),
    ));

    // Registered before the channel opens so no transition is missed.
    let mut tracker = DeviceTracker::fleet(Arc::clone(&state));
    let binding = spawn_session_binding(Arc::clone(&client), sessions.subscribe());

    let snapshot = backend.list().await?;
    info!(devices = snapshot.data.len(), "Device snapshot loaded");
    tracker.load_snapshot(snapshot.data);

    let mut status_rx = client.subscribe_status();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *status_rx.borrow_and_update();
                info!(status = %status, "Realtime channel status");
            }
            _ = tracker.changed() => {
                for applied in tracker.drain() {
                    match tracker.device(&applied.transition.device_id) {
                        Some(device) => info!(
                            sequence = applied.sequence,
                            device_id = %device.id,
                            status = %device.status,
                            busy_reason = ?device.busy_reason,
                            firmware_name = ?device.firmware_name,
                            model_name = ?device.model_name,
                            "Device updated"
                        ),
                        None => debug!(
                            sequence = applied.sequence,
                            device_id = %applied.transition.device_id,
                            "Transition for untracked device"
                        ),
                    }
                }
            }
        }
    }

    client.shutdown().await;
    binding.abort();
    Ok(())
}

async fn establish_session(
    sessions: &SessionProvider,
    config: &AppConfig,
) -> Result<Session, BoxError> {
    match sessions.restore().await {
        Ok(Some(session)) => return Ok(session),
        Ok(None) => {}
        Err(error) => warn!(error = %error, "Could not restore session"),
    }

    match config.credentials.login() {
        Some((username, password)) => Ok(sessions.login(username, password).await?),
        None => Err(Box::new(AuthError::InvalidCredentials)),
    }
}
