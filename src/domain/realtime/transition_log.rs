//! Append-only transition log with per-reader cursors.
//!
//! Every lifecycle transition gets a monotonic sequence number. Each consumer
//! registers its own cursor and reads everything after it, so several
//! consumers (a fleet list and a device detail view, say) each apply the
//! same transitions exactly once, in arrival order, without stealing from
//! one another.
//!
//! ```text
//!   seq:   1   2   3   4   5   6
//!        ┌───┬───┬───┬───┬───┬───┐
//!        │ C │ B │ C │ D │ C │ B │
//!        └───┴───┴───┴───┴───┴───┘
//!                  ▲           ▲
//!          cursor(detail)  cursor(list)
//! ```
//!
//! Entries every registered cursor has passed are compacted away. With no
//! cursors registered, at most `retention` entries are kept. A cursor that
//! falls behind the retention window is told how many entries it missed.

use std::collections::{HashMap, VecDeque};

use crate::domain::device::LifecycleTransition;
use crate::domain::foundation::DeviceId;

/// Default number of entries retained when no reader keeps them alive.
pub const DEFAULT_TRANSITION_RETENTION: usize = 1024;

/// Handle identifying one reader's position in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(u64);

/// Where a newly registered cursor starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStart {
    /// Only transitions appended after registration.
    #[default]
    Head,
    /// Every transition still retained.
    Oldest,
}

/// A transition tagged with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedTransition {
    pub sequence: u64,
    pub transition: LifecycleTransition,
}

/// Result of one read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionBatch {
    pub transitions: Vec<SequencedTransition>,
    /// Entries this cursor wanted that had already been dropped.
    pub lagged: u64,
}

#[derive(Debug)]
pub struct TransitionLog {
    entries: VecDeque<SequencedTransition>,
    next_sequence: u64,
    cursors: HashMap<CursorId, u64>,
    next_cursor: u64,
    retention: usize,
}

impl TransitionLog {
    pub fn new(retention: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: 1,
            cursors: HashMap::new(),
            next_cursor: 0,
            retention: retention.max(1),
        }
    }

    /// Appends a transition and returns its sequence number.
    pub fn append(&mut self, transition: LifecycleTransition) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push_back(SequencedTransition {
            sequence,
            transition,
        });
        self.compact();
        sequence
    }

    /// Sequence number of the newest entry ever appended (0 if none).
    pub fn head_sequence(&self) -> u64 {
        self.next_sequence - 1
    }

    fn oldest_sequence(&self) -> u64 {
        self.entries
            .front()
            .map(|e| e.sequence)
            .unwrap_or(self.next_sequence)
    }

    pub fn register(&mut self, start: CursorStart) -> CursorId {
        let id = CursorId(self.next_cursor);
        self.next_cursor += 1;
        let position = match start {
            CursorStart::Head => self.next_sequence,
            CursorStart::Oldest => self.oldest_sequence(),
        };
        self.cursors.insert(id, position);
        id
    }

    /// Forgets a cursor. Releasing an unknown cursor is a no-op.
    pub fn release(&mut self, cursor: CursorId) {
        if self.cursors.remove(&cursor).is_some() {
            self.compact();
        }
    }

    pub fn cursor_count(&self) -> usize {
        self.cursors.len()
    }

    /// Reads up to `max` transitions after `cursor`, advancing it.
    ///
    /// With `device` set, transitions for other devices are skipped (the
    /// cursor still moves past them). Returns `None` for an unknown cursor.
    pub fn read(
        &mut self,
        cursor: CursorId,
        max: usize,
        device: Option<&DeviceId>,
    ) -> Option<TransitionBatch> {
        let wanted = *self.cursors.get(&cursor)?;
        let oldest = self.oldest_sequence();
        let mut batch = TransitionBatch {
            transitions: Vec::new(),
            lagged: oldest.saturating_sub(wanted),
        };

        let mut position = wanted.max(oldest);
        let skip = (position - oldest) as usize;
        for entry in self.entries.iter().skip(skip) {
            if batch.transitions.len() >= max {
                break;
            }
            position = entry.sequence + 1;
            if device.map_or(true, |d| *d == entry.transition.device_id) {
                batch.transitions.push(entry.clone());
            }
        }

        self.cursors.insert(cursor, position);
        self.compact();
        Some(batch)
    }

    /// Number of unread transitions for `cursor` (optionally for one device).
    pub fn pending(&self, cursor: CursorId, device: Option<&DeviceId>) -> usize {
        let Some(&wanted) = self.cursors.get(&cursor) else {
            return 0;
        };
        self.entries
            .iter()
            .filter(|e| e.sequence >= wanted)
            .filter(|e| device.map_or(true, |d| *d == e.transition.device_id))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn compact(&mut self) {
        if let Some(&slowest) = self.cursors.values().min() {
            while self
                .entries
                .front()
                .map_or(false, |e| e.sequence < slowest)
            {
                self.entries.pop_front();
            }
        }
        while self.entries.len() > self.retention {
            self.entries.pop_front();
        }
    }
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::TransitionAction;
    use proptest::prelude::*;

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s).unwrap()
    }

    fn sequences(batch: &TransitionBatch) -> Vec<u64> {
        batch.transitions.iter().map(|t| t.sequence).collect()
    }

    #[test]
    fn append_assigns_monotonic_sequences() {
        let mut log = TransitionLog::default();
        assert_eq!(log.append(LifecycleTransition::busy(id("d1"))), 1);
        assert_eq!(log.append(LifecycleTransition::connected(id("d1"))), 2);
        assert_eq!(log.head_sequence(), 2);
    }

    #[test]
    fn head_cursor_sees_only_new_entries() {
        let mut log = TransitionLog::default();
        log.append(LifecycleTransition::busy(id("d1")));
        let cursor = log.register(CursorStart::Head);
        log.append(LifecycleTransition::connected(id("d1")));

        let batch = log.read(cursor, usize::MAX, None).unwrap();
        assert_eq!(sequences(&batch), vec![2]);
    }

    #[test]
    fn oldest_cursor_replays_retained_entries() {
        let mut log = TransitionLog::default();
        log.append(LifecycleTransition::busy(id("d1")));
        log.append(LifecycleTransition::connected(id("d1")));
        let cursor = log.register(CursorStart::Oldest);

        let batch = log.read(cursor, usize::MAX, None).unwrap();
        assert_eq!(sequences(&batch), vec![1, 2]);
    }

    #[test]
    fn independent_cursors_each_see_every_entry_once() {
        let mut log = TransitionLog::default();
        let list = log.register(CursorStart::Head);
        let detail = log.register(CursorStart::Head);

        log.append(LifecycleTransition::busy(id("d1")));
        log.append(LifecycleTransition::connected(id("d1")));

        assert_eq!(sequences(&log.read(list, usize::MAX, None).unwrap()), vec![1, 2]);
        assert_eq!(sequences(&log.read(detail, 1, None).unwrap()), vec![1]);
        assert_eq!(sequences(&log.read(detail, 1, None).unwrap()), vec![2]);
        assert!(log.read(list, usize::MAX, None).unwrap().transitions.is_empty());
    }

    #[test]
    fn device_filter_skips_other_devices_but_advances() {
        let mut log = TransitionLog::default();
        let cursor = log.register(CursorStart::Head);
        log.append(LifecycleTransition::busy(id("d2")));
        log.append(LifecycleTransition::busy(id("d1")));
        log.append(LifecycleTransition::connected(id("d2")));

        let batch = log.read(cursor, usize::MAX, Some(&id("d1"))).unwrap();
        assert_eq!(sequences(&batch), vec![2]);
        assert_eq!(log.pending(cursor, None), 0);
    }

    #[test]
    fn entries_passed_by_every_cursor_are_compacted() {
        let mut log = TransitionLog::default();
        let a = log.register(CursorStart::Head);
        let b = log.register(CursorStart::Head);
        log.append(LifecycleTransition::busy(id("d1")));
        log.append(LifecycleTransition::connected(id("d1")));

        log.read(a, usize::MAX, None);
        assert_eq!(log.len(), 2);

        log.read(b, 1, None);
        assert_eq!(log.len(), 1);

        log.release(b);
        assert!(log.is_empty());
    }

    #[test]
    fn retention_bounds_log_without_readers() {
        let mut log = TransitionLog::new(3);
        for _ in 0..10 {
            log.append(LifecycleTransition::busy(id("d1")));
        }
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn lagging_cursor_reports_missed_entries() {
        let mut log = TransitionLog::new(2);
        let cursor = log.register(CursorStart::Head);
        for _ in 0..5 {
            log.append(LifecycleTransition::busy(id("d1")));
        }

        let batch = log.read(cursor, usize::MAX, None).unwrap();
        assert_eq!(batch.lagged, 3);
        assert_eq!(sequences(&batch), vec![4, 5]);
    }

    #[test]
    fn unknown_cursor_reads_none() {
        let mut log = TransitionLog::default();
        let cursor = log.register(CursorStart::Head);
        log.release(cursor);
        assert!(log.read(cursor, 1, None).is_none());
        assert_eq!(log.pending(cursor, None), 0);
    }

    proptest! {
        #[test]
        fn chunked_reads_preserve_arrival_order(
            devices in proptest::collection::vec(0u8..3, 0..60),
            chunk in 1usize..7,
        ) {
            let mut log = TransitionLog::default();
            let all = log.register(CursorStart::Head);
            let chunked = log.register(CursorStart::Head);
            for d in &devices {
                log.append(LifecycleTransition::busy(id(&format!("d{}", d))));
            }

            let expected = log.read(all, usize::MAX, None).unwrap().transitions;
            let mut seen = Vec::new();
            loop {
                let batch = log.read(chunked, chunk, None).unwrap();
                if batch.transitions.is_empty() {
                    break;
                }
                seen.extend(batch.transitions);
            }

            prop_assert_eq!(seen, expected);
            prop_assert!(log.is_empty());
        }
    }

    #[test]
    fn transitions_keep_their_payload() {
        let mut log = TransitionLog::default();
        let cursor = log.register(CursorStart::Head);
        log.append(LifecycleTransition::connected(id("d1")).with_firmware_name(Some("v2".into())));

        let batch = log.read(cursor, 1, None).unwrap();
        let t = &batch.transitions[0].transition;
        assert_eq!(t.action, TransitionAction::Connected);
        assert_eq!(t.firmware_name.as_deref(), Some("v2"));
    }
}
