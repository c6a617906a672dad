//! Ties the realtime channel lifecycle to the session.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::foundation::Session;

use super::client::RealtimeClient;

/// Follows `sessions` and keeps `client` in step with it.
///
/// | Session change            | Channel action        |
/// |---------------------------|-----------------------|
/// | absent → present          | `init`                |
/// | present → other identity  | `init` (re-opens)     |
/// | present → absent          | `shutdown`            |
/// | provider dropped          | `shutdown`, task ends |
pub fn spawn_session_binding(
    client: Arc<RealtimeClient>,
    mut sessions: watch::Receiver<Option<Session>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let current = sessions.borrow_and_update().clone();
            match current {
                Some(session) => {
                    client.init(&session).await;
                }
                None => client.shutdown().await,
            }

            if sessions.changed().await.is_err() {
                debug!("Session provider dropped, closing realtime channel");
                break;
            }
        }
        client.shutdown().await;
    })
}
