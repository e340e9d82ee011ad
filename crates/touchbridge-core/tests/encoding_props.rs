// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property tests over batch encoding and reconciliation.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use touchbridge_core::{
    wire_state, ContactId, ContactSize, LifecycleState, LifecycleTable, ManualClock, PendingEntry,
    Position, ReportEncoder,
};
use touchbridge_proto::{decode_sequence, reports_for, MultiTouchReport, TRUE_COUNT_OFFSET};

fn state_strategy() -> impl Strategy<Value = LifecycleState> {
    prop_oneof![
        Just(LifecycleState::Adding),
        Just(LifecycleState::Updated),
        Just(LifecycleState::Removing),
        Just(LifecycleState::Removed),
    ]
}

/// Ordered batch with unique ids, as the table produces.
fn batch_strategy() -> impl Strategy<Value = Vec<PendingEntry>> {
    prop::collection::btree_map(1u16..=400, (state_strategy(), any::<[u16; 4]>()), 0..40).prop_map(
        |entries: BTreeMap<u16, (LifecycleState, [u16; 4])>| {
            entries
                .into_iter()
                .map(|(raw, (state, [x, y, width, height]))| PendingEntry {
                    id: ContactId::new(raw).unwrap(),
                    state,
                    position: Position::new(x, y),
                    size: ContactSize { width, height },
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn batch_encodes_to_ceil_half_reports(batch in batch_strategy(), now in any::<u32>()) {
        let encoder = ReportEncoder::new(ManualClock::starting_at(now));
        let reports = encoder.encode(&batch);
        prop_assert_eq!(reports.len(), reports_for(batch.len()));
        if batch.is_empty() {
            return Ok(());
        }

        let bytes: Vec<_> = reports.iter().map(MultiTouchReport::to_bytes).collect();
        prop_assert_eq!(usize::from(bytes[0][TRUE_COUNT_OFFSET]), batch.len());
        for later in &bytes[1..] {
            prop_assert_eq!(later[TRUE_COUNT_OFFSET], 0);
        }

        let records = decode_sequence(&bytes).unwrap();
        prop_assert_eq!(records.len(), batch.len());
        for (record, entry) in records.iter().zip(&batch) {
            prop_assert_eq!(record.contact_id, entry.id.get());
            prop_assert_eq!(record.state, wire_state(entry.state));
            prop_assert_eq!((record.x, record.y), (entry.position.x, entry.position.y));
            prop_assert_eq!((record.width, record.height), (entry.size.width, entry.size.height));
            prop_assert_eq!(record.timestamp_ms, now);
        }
    }

    #[test]
    fn every_identity_walks_the_lifecycle_one_step_per_batch(
        script in prop::collection::vec(
            prop::collection::vec((1u16..=6, 0u8..3), 0..6),
            1..30,
        )
    ) {
        let mut table = LifecycleTable::new();
        // State each identity was last reported in, until its Removed pass.
        let mut last: BTreeMap<u16, LifecycleState> = BTreeMap::new();
        for cycle in script {
            let drained = cycle
                .into_iter()
                .map(|(raw, phase)| PendingEntry {
                    id: ContactId::new(raw).unwrap(),
                    state: match phase {
                        0 => LifecycleState::Adding,
                        1 => LifecycleState::Updated,
                        _ => LifecycleState::Removing,
                    },
                    position: Position::default(),
                    size: ContactSize::default(),
                })
                .collect();
            let (batch, _) = table.reconcile(drained);

            let mut reported = BTreeMap::new();
            for entry in &batch {
                prop_assert!(
                    reported.insert(entry.id.get(), entry.state).is_none(),
                    "duplicate id in batch"
                );
            }

            // Everything reported last cycle and not yet removed is reported
            // again, and a Removing is always followed by exactly one Removed.
            for (raw, previous) in &last {
                let now = reported.get(raw).copied();
                prop_assert!(now.is_some(), "id {} dropped after {:?}", raw, previous);
                if *previous == LifecycleState::Removing {
                    prop_assert_eq!(now, Some(LifecycleState::Removed));
                }
            }

            for (raw, state) in reported {
                let previous = last.get(&raw).copied();
                match state {
                    LifecycleState::Adding => prop_assert_eq!(previous, None),
                    LifecycleState::Updated | LifecycleState::Removing => prop_assert!(
                        matches!(previous, Some(LifecycleState::Adding | LifecycleState::Updated)),
                        "id {} reported {:?} after {:?}", raw, state, previous
                    ),
                    LifecycleState::Removed => {
                        prop_assert_eq!(previous, Some(LifecycleState::Removing));
                        prop_assert_eq!(table.state(ContactId::new(raw).unwrap()), None);
                    }
                }
                if state == LifecycleState::Removed {
                    last.remove(&raw);
                } else {
                    last.insert(raw, state);
                }
            }
        }
    }
}
