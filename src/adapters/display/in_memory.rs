//! In-memory frame display.
//!
//! Keeps a registry of live handles so tests (and the monitor binary) can
//! detect leaked handles and double releases.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::domain::foundation::DeviceId;
use crate::domain::realtime::ImageFrame;
use crate::ports::{DisplayError, DisplayHandle, FrameDisplay};

#[derive(Debug, Clone)]
struct Shown {
    device_id: Option<DeviceId>,
    sequence: u64,
}

#[derive(Debug, Default)]
struct Registry {
    next: u64,
    live: HashMap<DisplayHandle, Shown>,
    released: HashSet<DisplayHandle>,
    created: usize,
    double_releases: usize,
    reject_creates: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryFrameDisplay {
    registry: Mutex<Registry>,
}

impl InMemoryFrameDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create` fail.
    pub fn reject_creates(&self, reject: bool) {
        self.lock().reject_creates = reject;
    }

    /// Handles created and not yet released.
    pub fn live_handles(&self) -> usize {
        self.lock().live.len()
    }

    pub fn created_count(&self) -> usize {
        self.lock().created
    }

    pub fn released_count(&self) -> usize {
        self.lock().released.len()
    }

    /// Release calls for handles that had already been released.
    pub fn double_releases(&self) -> usize {
        self.lock().double_releases
    }

    pub fn is_live(&self, handle: DisplayHandle) -> bool {
        self.lock().live.contains_key(&handle)
    }

    /// Sequence number of the frame behind a live handle.
    pub fn shown_sequence(&self, handle: DisplayHandle) -> Option<u64> {
        self.lock().live.get(&handle).map(|s| s.sequence)
    }

    /// Device of the frame behind a live handle (`None` for the legacy slot).
    pub fn shown_device(&self, handle: DisplayHandle) -> Option<DeviceId> {
        self.lock().live.get(&handle).and_then(|s| s.device_id.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameDisplay for InMemoryFrameDisplay {
    fn create(
        &self,
        device_id: Option<&DeviceId>,
        frame: &ImageFrame,
    ) -> Result<DisplayHandle, DisplayError> {
        let mut registry = self.lock();
        if registry.reject_creates {
            return Err(DisplayError::Rejected("display unavailable".to_string()));
        }

        registry.next += 1;
        registry.created += 1;
        let handle = DisplayHandle::new(registry.next);
        registry.live.insert(
            handle,
            Shown {
                device_id: device_id.cloned(),
                sequence: frame.sequence,
            },
        );
        Ok(handle)
    }

    fn release(&self, handle: DisplayHandle) -> Result<(), DisplayError> {
        let mut registry = self.lock();
        if registry.live.remove(&handle).is_some() {
            registry.released.insert(handle);
            return Ok(());
        }

        registry.double_releases += 1;
        Err(DisplayError::AlreadyReleased(handle))
    }
}
