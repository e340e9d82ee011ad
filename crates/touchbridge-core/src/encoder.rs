// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batch → report sequence encoding.
//!
//! This is the one place where lifecycle states become wire states.

use touchbridge_proto::{ContactRecord, MultiTouchReport, WireState, MAX_CONTACTS_PER_REPORT};

use crate::clock::Clock;
use crate::contact::{LifecycleState, PendingEntry};

/// Wire state the driver expects for a lifecycle state.
pub const fn wire_state(state: LifecycleState) -> WireState {
    match state {
        LifecycleState::Adding => WireState::Adding,
        LifecycleState::Updated => WireState::Updated,
        LifecycleState::Removing => WireState::Removing,
        LifecycleState::Removed => WireState::Removed,
    }
}

/// Packs ordered batches into fixed-size reports, stamping each record with
/// the encoder clock at encode time.
#[derive(Debug, Clone)]
pub struct ReportEncoder<C> {
    clock: C,
}

impl<C: Clock> ReportEncoder<C> {
    /// Encoder reading timestamps from `clock`.
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Split `batch` into `ceil(N / K)` reports.
    ///
    /// The first report announces the true count of the whole batch
    /// (saturating at 255); the rest announce zero. An empty batch yields no
    /// reports.
    pub fn encode(&self, batch: &[PendingEntry]) -> Vec<MultiTouchReport> {
        let true_count = u8::try_from(batch.len()).unwrap_or(u8::MAX);
        let timestamp_ms = self.clock.now_ms();

        batch
            .chunks(MAX_CONTACTS_PER_REPORT)
            .enumerate()
            .map(|(index, chunk)| {
                let mut report = if index == 0 {
                    MultiTouchReport::first(true_count)
                } else {
                    MultiTouchReport::continuation()
                };
                for entry in chunk {
                    report.add_contact(record(entry, timestamp_ms));
                }
                report
            })
            .collect()
    }
}

fn record(entry: &PendingEntry, timestamp_ms: u32) -> ContactRecord {
    ContactRecord {
        state: wire_state(entry.state),
        contact_id: entry.id.get(),
        x: entry.position.x,
        y: entry.position.y,
        width: entry.size.width,
        height: entry.size.height,
        timestamp_ms,
    }
}
