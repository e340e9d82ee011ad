// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Inbound queue: the single hand-off point between producers and the
//! dispatcher.
//!
//! The lock is held only for the push or the drain itself. Encoding and
//! transport I/O always happen after the drained entries have left the lock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::contact::{ContactEvent, PendingEntry};

/// Thread-safe FIFO of pending lifecycle transitions.
///
/// Cloning yields another handle to the same queue; hand one to every
/// producer.
#[derive(Clone, Default)]
pub struct InboundQueue {
    inner: Arc<Mutex<VecDeque<PendingEntry>>>,
}

impl InboundQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the tail. Never rejects input.
    pub fn enqueue(&self, entry: PendingEntry) {
        self.lock().push_back(entry);
    }

    /// Append several entries under one lock acquisition, preserving order.
    pub fn enqueue_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = PendingEntry>,
    {
        self.lock().extend(entries);
    }

    /// Remove and return every queued entry in FIFO order.
    pub fn drain_all(&self) -> Vec<PendingEntry> {
        self.lock().drain(..).collect()
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A producer that panicked mid-push cannot leave a half-written entry
    // behind, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingEntry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for InboundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundQueue")
            .field("len", &self.len())
            .finish()
    }
}

/// Producer-side handle: turns contact events into queued transitions.
///
/// This is the upstream interface; input sources call [`ContactSink::submit`]
/// once per observed contact per frame.
#[derive(Clone, Debug, Default)]
pub struct ContactSink {
    queue: InboundQueue,
}

impl ContactSink {
    /// Sink feeding `queue`.
    pub fn new(queue: InboundQueue) -> Self {
        Self { queue }
    }

    /// Queue one event (Start → Adding, Move → Updated, End → Removing).
    pub fn submit(&self, event: ContactEvent) {
        self.queue.enqueue(event.into());
    }

    /// Queue every event of one upstream frame, keeping frame order.
    pub fn submit_frame<I>(&self, events: I)
    where
        I: IntoIterator<Item = ContactEvent>,
    {
        self.queue
            .enqueue_all(events.into_iter().map(PendingEntry::from));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::contact::{ContactId, ContactPhase, LifecycleState, Position};

    fn event(id: u16, phase: ContactPhase) -> ContactEvent {
        ContactEvent::new(ContactId::new(id).unwrap(), phase, Position::new(id, id))
    }

    #[test]
    fn drain_returns_fifo_and_clears() {
        let queue = InboundQueue::new();
        let sink = ContactSink::new(queue.clone());
        sink.submit(event(1, ContactPhase::Start));
        sink.submit_frame([event(2, ContactPhase::Start), event(1, ContactPhase::End)]);
        assert_eq!(queue.len(), 3);

        let drained = queue.drain_all();
        let seen: Vec<(u16, LifecycleState)> =
            drained.iter().map(|e| (e.id.get(), e.state)).collect();
        assert_eq!(
            seen,
            vec![
                (1, LifecycleState::Adding),
                (2, LifecycleState::Adding),
                (1, LifecycleState::Removing),
            ]
        );
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn poisoned_lock_keeps_entries() {
        let queue = InboundQueue::new();
        queue.enqueue(event(3, ContactPhase::Move).into());
        let q = queue.clone();
        let _ = std::thread::spawn(move || {
            let _guard = q.inner.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert_eq!(queue.drain_all().len(), 1);
    }
}
