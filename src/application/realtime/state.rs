//! Session-scoped realtime sinks.
//!
//! `RealtimeState` holds everything the realtime channel produces:
//!
//! ```text
//!                      ┌──────────────────────────────┐
//!   channel ──write──▶ │ transitions  (TransitionLog) │ ──read──▶ DeviceTracker (cursor each)
//!   (generation N)     │ images       per device, cap │ ──pop───▶ InferenceViewer
//!                      │ logs         per device, cap │ ──read──▶ log views
//!                      │ latest binary (legacy slot)  │
//!                      └──────────────────────────────┘
//! ```
//!
//! Every write carries the connection generation that produced it. Only the
//! generation currently accepted may write; after [`RealtimeState::end`] no
//! write succeeds, so a frame still in flight after shutdown is dropped.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::domain::device::LifecycleTransition;
use crate::domain::foundation::DeviceId;
use crate::domain::realtime::{
    BoundedBuffer, ChannelStatus, CursorId, CursorStart, ImageFrame, LogEntry, TransitionBatch,
    TransitionLog, DEFAULT_BUFFER_CAPACITY, DEFAULT_TRANSITION_RETENTION,
};

/// Capacities of the realtime sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkLimits {
    /// Images kept per device before the oldest is evicted.
    pub image_capacity: usize,
    /// Log lines kept per device before the oldest is evicted.
    pub log_capacity: usize,
    /// Transitions kept while no reader holds them.
    pub transition_retention: usize,
}

impl Default for SinkLimits {
    fn default() -> Self {
        Self {
            image_capacity: DEFAULT_BUFFER_CAPACITY,
            log_capacity: DEFAULT_BUFFER_CAPACITY,
            transition_retention: DEFAULT_TRANSITION_RETENTION,
        }
    }
}

#[derive(Debug)]
struct DeviceImages {
    frames: BoundedBuffer<ImageFrame>,
    received: u64,
}

#[derive(Debug)]
struct Sinks {
    accepting: Option<u64>,
    transitions: TransitionLog,
    images: HashMap<DeviceId, DeviceImages>,
    logs: HashMap<DeviceId, BoundedBuffer<LogEntry>>,
    latest_binary: Option<ImageFrame>,
    binary_received: u64,
    arrivals: u64,
}

impl Sinks {
    fn accepts(&self, generation: u64) -> bool {
        self.accepting == Some(generation)
    }
}

/// Shared sinks written by the realtime channel and read by consumers.
#[derive(Debug)]
pub struct RealtimeState {
    limits: SinkLimits,
    sinks: Mutex<Sinks>,
    status_tx: watch::Sender<ChannelStatus>,
    head_tx: watch::Sender<u64>,
    images_tx: watch::Sender<u64>,
}

impl RealtimeState {
    /// Creates empty sinks. No generation is accepted until a connection
    /// begins.
    pub fn new(limits: SinkLimits) -> Self {
        let (status_tx, _) = watch::channel(ChannelStatus::Disconnected);
        let (head_tx, _) = watch::channel(0);
        let (images_tx, _) = watch::channel(0);
        Self {
            limits,
            sinks: Mutex::new(Sinks {
                accepting: None,
                transitions: TransitionLog::new(limits.transition_retention),
                images: HashMap::new(),
                logs: HashMap::new(),
                latest_binary: None,
                binary_received: 0,
                arrivals: 0,
            }),
            status_tx,
            head_tx,
            images_tx,
        }
    }

    /// Capacities the sinks were created with.
    pub fn limits(&self) -> SinkLimits {
        self.limits
    }

    fn lock(&self) -> MutexGuard<'_, Sinks> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // Generation guard
    // ============================================

    /// Accepts writes from `generation` only.
    pub(crate) fn begin(&self, generation: u64) {
        self.lock().accepting = Some(generation);
    }

    /// Refuses every further write until the next `begin`.
    pub(crate) fn end(&self) {
        self.lock().accepting = None;
    }

    pub fn accepts(&self, generation: u64) -> bool {
        self.lock().accepts(generation)
    }

    /// Drops buffered images, logs and the legacy frame.
    ///
    /// Used when a session ends or switches to another user. The transition
    /// log is kept: trackers hold cursors into it.
    pub(crate) fn clear_buffers(&self) {
        let mut sinks = self.lock();
        sinks.images.clear();
        sinks.logs.clear();
        sinks.latest_binary = None;
    }

    // ============================================
    // Channel status
    // ============================================

    /// Publishes `status` if `generation` is still accepted.
    pub(crate) fn set_status(&self, generation: u64, status: ChannelStatus) -> bool {
        let sinks = self.lock();
        if !sinks.accepts(generation) {
            return false;
        }
        self.status_tx.send_replace(status);
        true
    }

    /// Publishes `status` unconditionally (shutdown path).
    pub(crate) fn publish_status(&self, status: ChannelStatus) {
        self.status_tx.send_replace(status);
    }

    /// Current channel status.
    pub fn status(&self) -> ChannelStatus {
        *self.status_tx.borrow()
    }

    /// Watches channel status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    // ============================================
    // Writes (channel side)
    // ============================================

    /// Appends a transition. Returns its sequence, or `None` if refused.
    pub(crate) fn record_transition(
        &self,
        generation: u64,
        transition: LifecycleTransition,
    ) -> Option<u64> {
        let sequence = {
            let mut sinks = self.lock();
            if !sinks.accepts(generation) {
                return None;
            }
            sinks.transitions.append(transition)
        };
        self.head_tx.send_replace(sequence);
        Some(sequence)
    }

    /// Buffers a decoded image. Returns its per-device sequence (1-based).
    pub(crate) fn record_image(
        &self,
        generation: u64,
        device_id: DeviceId,
        data: Vec<u8>,
    ) -> Option<u64> {
        let capacity = self.limits.image_capacity;
        let (sequence, arrivals) = {
            let mut sinks = self.lock();
            if !sinks.accepts(generation) {
                return None;
            }
            let images = sinks.images.entry(device_id).or_insert_with(|| DeviceImages {
                frames: BoundedBuffer::new(capacity),
                received: 0,
            });
            images.received += 1;
            let sequence = images.received;
            images.frames.push(ImageFrame::new(sequence, data));
            sinks.arrivals += 1;
            (sequence, sinks.arrivals)
        };
        self.images_tx.send_replace(arrivals);
        Some(sequence)
    }

    /// Buffers a log line.
    pub(crate) fn record_log(&self, generation: u64, device_id: DeviceId, entry: LogEntry) -> bool {
        let capacity = self.limits.log_capacity;
        let mut sinks = self.lock();
        if !sinks.accepts(generation) {
            return false;
        }
        sinks
            .logs
            .entry(device_id)
            .or_insert_with(|| BoundedBuffer::new(capacity))
            .push(entry);
        true
    }

    /// Replaces the legacy single-frame slot.
    pub(crate) fn record_binary(&self, generation: u64, data: Vec<u8>) -> Option<u64> {
        let (sequence, arrivals) = {
            let mut sinks = self.lock();
            if !sinks.accepts(generation) {
                return None;
            }
            sinks.binary_received += 1;
            let sequence = sinks.binary_received;
            sinks.latest_binary = Some(ImageFrame::new(sequence, data));
            sinks.arrivals += 1;
            (sequence, sinks.arrivals)
        };
        self.images_tx.send_replace(arrivals);
        Some(sequence)
    }

    // ============================================
    // Transition log (consumer side)
    // ============================================

    /// Registers a new reader of the transition log.
    pub fn register_cursor(&self, start: CursorStart) -> CursorId {
        self.lock().transitions.register(start)
    }

    /// Forgets a reader so the entries it held can be compacted.
    pub fn release_cursor(&self, cursor: CursorId) {
        self.lock().transitions.release(cursor);
    }

    /// Reads up to `max` transitions after `cursor`, optionally for one
    /// device only. `None` for a released cursor.
    pub fn read_transitions(
        &self,
        cursor: CursorId,
        max: usize,
        device: Option<&DeviceId>,
    ) -> Option<TransitionBatch> {
        self.lock().transitions.read(cursor, max, device)
    }

    /// Unread transitions for `cursor`.
    pub fn pending_transitions(&self, cursor: CursorId, device: Option<&DeviceId>) -> usize {
        self.lock().transitions.pending(cursor, device)
    }

    /// Sequence of the newest transition appended so far.
    pub fn transition_head(&self) -> u64 {
        *self.head_tx.borrow()
    }

    /// Changes whenever a transition is appended.
    pub fn subscribe_transitions(&self) -> watch::Receiver<u64> {
        self.head_tx.subscribe()
    }

    /// Entries currently retained in the transition log.
    pub fn retained_transitions(&self) -> usize {
        self.lock().transitions.len()
    }

    // ============================================
    // Images and logs (consumer side)
    // ============================================

    /// Removes and returns the oldest buffered image for `device_id`.
    pub fn pop_image(&self, device_id: &DeviceId) -> Option<ImageFrame> {
        self.lock()
            .images
            .get_mut(device_id)
            .and_then(|i| i.frames.pop_front())
    }

    /// Oldest buffered image for `device_id`, left in place.
    pub fn front_image(&self, device_id: &DeviceId) -> Option<ImageFrame> {
        self.lock()
            .images
            .get(device_id)
            .and_then(|i| i.frames.front().cloned())
    }

    /// Images buffered for `device_id`.
    pub fn image_count(&self, device_id: &DeviceId) -> usize {
        self.lock()
            .images
            .get(device_id)
            .map_or(0, |i| i.frames.len())
    }

    /// Changes whenever an image or legacy frame arrives.
    pub fn subscribe_images(&self) -> watch::Receiver<u64> {
        self.images_tx.subscribe()
    }

    /// Snapshot of the log buffer for `device_id`, oldest first.
    pub fn logs(&self, device_id: &DeviceId) -> Vec<LogEntry> {
        self.lock()
            .logs
            .get(device_id)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent raw binary frame, if any.
    pub fn latest_binary(&self) -> Option<ImageFrame> {
        self.lock().latest_binary.clone()
    }
}

impl Default for RealtimeState {
    fn default() -> Self {
        Self::new(SinkLimits::default())
    }
}
