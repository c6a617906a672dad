//! DeviceTracker - one consumer of the transition log.
//!
//! A tracker owns its own copy of device state (loaded from a REST
//! snapshot) and its own cursor into the shared transition log. Any number
//! of trackers can be alive at once; each applies every transition in its
//! scope exactly once, in log order.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::device::{apply_to_fleet, BusyReason, Device, LifecycleTransition};
use crate::domain::foundation::DeviceId;
use crate::domain::realtime::{CursorId, CursorStart};

use crate::application::realtime::RealtimeState;

/// Which transitions a tracker follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerScope {
    Fleet,
    Device(DeviceId),
}

impl TrackerScope {
    fn device_filter(&self) -> Option<&DeviceId> {
        match self {
            TrackerScope::Fleet => None,
            TrackerScope::Device(id) => Some(id),
        }
    }
}

/// One transition folded into tracker state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    pub sequence: u64,
    pub transition: LifecycleTransition,
    /// False when the device is not in this tracker's state.
    pub matched: bool,
}

pub struct DeviceTracker {
    state: Arc<RealtimeState>,
    cursor: CursorId,
    scope: TrackerScope,
    devices: Vec<Device>,
    head_rx: watch::Receiver<u64>,
    lagged: u64,
}

impl DeviceTracker {
    /// Tracks every device.
    pub fn fleet(state: Arc<RealtimeState>) -> Self {
        Self::with_scope(state, TrackerScope::Fleet, CursorStart::Head)
    }

    /// Tracks a single device.
    pub fn for_device(state: Arc<RealtimeState>, device_id: DeviceId) -> Self {
        Self::with_scope(state, TrackerScope::Device(device_id), CursorStart::Head)
    }

    pub fn with_scope(state: Arc<RealtimeState>, scope: TrackerScope, start: CursorStart) -> Self {
        let cursor = state.register_cursor(start);
        let head_rx = state.subscribe_transitions();
        Self {
            state,
            cursor,
            scope,
            devices: Vec::new(),
            head_rx,
            lagged: 0,
        }
    }

    pub fn scope(&self) -> &TrackerScope {
        &self.scope
    }

    /// Replaces local state with a REST snapshot.
    ///
    /// A single-device tracker keeps only its own device.
    pub fn load_snapshot(&mut self, devices: Vec<Device>) {
        self.devices = match &self.scope {
            TrackerScope::Fleet => devices,
            TrackerScope::Device(id) => devices.into_iter().filter(|d| d.id == *id).collect(),
        };
        debug!(count = self.devices.len(), "Device snapshot loaded");
    }

    /// Applies the next unread transition, if any.
    pub fn drain_one(&mut self) -> Option<AppliedTransition> {
        let batch = self
            .state
            .read_transitions(self.cursor, 1, self.scope.device_filter())?;

        if batch.lagged > 0 {
            warn!(missed = batch.lagged, "Device tracker fell behind the transition log");
            self.lagged += batch.lagged;
        }

        let entry = batch.transitions.into_iter().next()?;
        let matched = apply_to_fleet(&mut self.devices, &entry.transition);
        debug!(
            sequence = entry.sequence,
            device_id = %entry.transition.device_id,
            action = ?entry.transition.action,
            matched,
            "Transition applied"
        );

        Some(AppliedTransition {
            sequence: entry.sequence,
            transition: entry.transition,
            matched,
        })
    }

    /// Applies every unread transition, in order.
    pub fn drain(&mut self) -> Vec<AppliedTransition> {
        std::iter::from_fn(|| self.drain_one()).collect()
    }

    /// Unread transitions in scope.
    pub fn pending(&self) -> usize {
        self.state
            .pending_transitions(self.cursor, self.scope.device_filter())
    }

    /// Total entries this tracker missed because it fell too far behind.
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Waits until at least one unread transition is in scope.
    pub async fn changed(&mut self) {
        while self.pending() == 0 {
            if self.head_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Optimistically marks a device busy. Returns false for unknown ids.
    pub fn mark_busy(&mut self, device_id: &DeviceId, reason: BusyReason) -> bool {
        match self.devices.iter_mut().find(|d| d.id == *device_id) {
            Some(device) => {
                device.mark_busy(reason);
                true
            }
            None => false,
        }
    }

    pub fn device(&self, device_id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == *device_id)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }
}

impl Drop for DeviceTracker {
    fn drop(&mut self) {
        self.state.release_cursor(self.cursor);
    }
}

impl std::fmt::Debug for DeviceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTracker")
            .field("cursor", &self.cursor)
            .field("scope", &self.scope)
            .field("devices", &self.devices.len())
            .finish()
    }
}
