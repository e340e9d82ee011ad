// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lifecycle table and per-cycle reconciliation.
//!
//! The table is the single source of truth for "what must still be
//! reported". One [`LifecycleTable::reconcile`] call is one dispatch cycle:
//!
//! 1. apply entries held back last cycle, then the drained entries,
//!    discarding moves for identities that are already ending;
//! 2. build the batch from every entry written this cycle plus every
//!    untouched entry that is `Updated` (re-sent unchanged) or `Removed`
//!    (its single final pass);
//! 3. delete `Removed` entries, promote `Adding → Updated` and
//!    `Removing → Removed` for the next cycle.
//!
//! An identity never skips a step on the wire. A start for an identity that
//! is still ending waits until its `Removed` pass is out, and an end for an
//! `Adding` that has not been sent yet waits one cycle. Once an identity has
//! a held entry, everything after it for that identity is held too, so
//! producer order survives.
//!
//! Batches come out ordered by identity.

use std::collections::{BTreeMap, BTreeSet};

use crate::contact::{ContactId, LifecycleState, PendingEntry};

/// Per-cycle counters, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Entries drained from the queue.
    pub drained: usize,
    /// Entries written to the table.
    pub applied: usize,
    /// Entries dropped by the lifecycle rules.
    pub discarded: usize,
    /// Entries held back for a later cycle.
    pub deferred: usize,
    /// Entries deleted after their final `Removed` pass.
    pub deleted: usize,
}

/// What one incoming entry does to the table.
enum Admission {
    Write(PendingEntry),
    Defer,
    Discard,
}

/// Identity → last known lifecycle entry.
#[derive(Debug, Default)]
pub struct LifecycleTable {
    entries: BTreeMap<ContactId, PendingEntry>,
    deferred: Vec<PendingEntry>,
}

impl LifecycleTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `id`, if tracked.
    pub fn state(&self, id: ContactId) -> Option<LifecycleState> {
        self.entries.get(&id).map(|e| e.state)
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries waiting for a later cycle.
    pub fn deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Run one reconciliation pass over `drained` (in queue order) and return
    /// the batch to transmit.
    pub fn reconcile(&mut self, drained: Vec<PendingEntry>) -> (Vec<PendingEntry>, ReconcileStats) {
        let mut stats = ReconcileStats {
            drained: drained.len(),
            ..ReconcileStats::default()
        };

        let mut incoming = std::mem::take(&mut self.deferred);
        incoming.extend(drained);

        let mut touched = BTreeSet::new();
        let mut held = BTreeSet::new();
        for entry in incoming {
            let admission = if held.contains(&entry.id) {
                Admission::Defer
            } else {
                self.admit(entry)
            };
            match admission {
                Admission::Write(written) => {
                    self.entries.insert(written.id, written);
                    touched.insert(written.id);
                    stats.applied += 1;
                }
                Admission::Defer => {
                    held.insert(entry.id);
                    self.deferred.push(entry);
                    stats.deferred += 1;
                }
                Admission::Discard => stats.discarded += 1,
            }
        }

        let batch: Vec<PendingEntry> = self
            .entries
            .values()
            .filter(|e| {
                touched.contains(&e.id)
                    || matches!(e.state, LifecycleState::Updated | LifecycleState::Removed)
            })
            .copied()
            .collect();

        let before = self.entries.len();
        self.entries.retain(|_, e| e.state != LifecycleState::Removed);
        stats.deleted = before - self.entries.len();

        for entry in self.entries.values_mut() {
            entry.state = match entry.state {
                LifecycleState::Adding => LifecycleState::Updated,
                LifecycleState::Removing => LifecycleState::Removed,
                other => other,
            };
        }

        (batch, stats)
    }

    fn admit(&self, incoming: PendingEntry) -> Admission {
        use LifecycleState::{Adding, Removed, Removing, Updated};

        let current = self.entries.get(&incoming.id).map(|e| e.state);
        match (incoming.state, current) {
            // Removed comes from promotion only. End for an unknown or ending
            // identity is a no-op, and moves never resurrect an ending one.
            (Removed, _)
            | (Removing, None | Some(Removing | Removed))
            | (Updated, Some(Removing | Removed)) => Admission::Discard,

            // The unsent Adding goes out before its end; a restart waits for
            // the previous contact's Removed pass.
            (Removing, Some(Adding)) | (Adding, Some(Removing | Removed)) => Admission::Defer,

            (Removing, Some(Updated)) => Admission::Write(incoming),

            // First observation, through a start or a move.
            (Adding | Updated, None) => Admission::Write(incoming.with_state(Adding)),

            // Live identities keep their state and take the new position.
            (Adding | Updated, Some(state @ (Adding | Updated))) => {
                Admission::Write(incoming.with_state(state))
            }
        }
    }
}
