// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end dispatch cycles against a recording transport.
#![allow(clippy::unwrap_used)]

use std::thread;

use touchbridge_core::{
    DispatchError, InboundQueue, LifecycleState, ManualClock, ReportDispatcher, TransportError,
};
use touchbridge_dry_tests::{contact_id, end, moved, start, RecordingTransport};
use touchbridge_proto::{ContactRecord, WireState, TRUE_COUNT_OFFSET};

fn dispatcher() -> (ReportDispatcher<RecordingTransport, ManualClock>, RecordingTransport) {
    let transport = RecordingTransport::connected();
    let dispatcher = ReportDispatcher::with_clock(
        InboundQueue::new(),
        transport.clone(),
        ManualClock::default(),
    );
    (dispatcher, transport)
}

fn states(records: &[ContactRecord]) -> Vec<(u16, WireState)> {
    records.iter().map(|r| (r.contact_id, r.state)).collect()
}

#[test]
fn two_contacts_start_idle_end_and_disappear() {
    let (mut dispatcher, transport) = dispatcher();
    let sink = dispatcher.sink();

    sink.submit(start(1, 100, 100));
    sink.submit(start(2, 200, 200));
    dispatcher.dispatch().unwrap();
    let reports = transport.sent();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0][TRUE_COUNT_OFFSET], 2);
    assert_eq!(
        states(&transport.take_batch().unwrap()),
        vec![(1, WireState::Adding), (2, WireState::Adding)]
    );

    dispatcher.dispatch().unwrap();
    assert_eq!(
        states(&transport.take_batch().unwrap()),
        vec![(1, WireState::Updated), (2, WireState::Updated)]
    );

    sink.submit(end(1, 100, 100));
    dispatcher.dispatch().unwrap();
    assert_eq!(
        states(&transport.take_batch().unwrap()),
        vec![(1, WireState::Removing), (2, WireState::Updated)]
    );

    dispatcher.dispatch().unwrap();
    assert_eq!(
        states(&transport.take_batch().unwrap()),
        vec![(1, WireState::Removed), (2, WireState::Updated)]
    );

    for _ in 0..3 {
        dispatcher.dispatch().unwrap();
        assert_eq!(
            states(&transport.take_batch().unwrap()),
            vec![(2, WireState::Updated)]
        );
    }
    assert_eq!(dispatcher.state(contact_id(1)), None);
}

#[test]
fn unchanged_live_contact_is_resent_every_cycle() {
    let (mut dispatcher, transport) = dispatcher();
    dispatcher.process_frame([start(3, 40, 50)]).unwrap();
    transport.take_sent();

    for _ in 0..25 {
        dispatcher.dispatch().unwrap();
        let batch = transport.take_batch().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].state, WireState::Updated);
        assert_eq!((batch[0].x, batch[0].y), (40, 50));
    }
}

#[test]
fn move_after_end_keeps_removing() {
    let (mut dispatcher, transport) = dispatcher();
    dispatcher.process_frame([start(5, 1, 1)]).unwrap();
    let outcome = dispatcher
        .process_frame([end(5, 1, 1), moved(5, 9, 9)])
        .unwrap();
    assert_eq!(outcome.stats.discarded, 1);
    assert_eq!(dispatcher.state(contact_id(5)), Some(LifecycleState::Removed));

    transport.take_sent();
    dispatcher.process_frame([moved(5, 9, 9)]).unwrap();
    let batch = transport.take_batch().unwrap();
    assert_eq!(states(&batch), vec![(5, WireState::Removed)]);
}

#[test]
fn restarted_contact_gets_its_removed_pass_first() {
    let (mut dispatcher, transport) = dispatcher();
    dispatcher.process_frame([start(1, 0, 0)]).unwrap();
    dispatcher.process_frame([end(1, 0, 0)]).unwrap();
    transport.take_sent();

    let outcome = dispatcher.process_frame([start(1, 5, 5)]).unwrap();
    assert_eq!(outcome.stats.deferred, 1);
    assert_eq!(
        states(&transport.take_batch().unwrap()),
        vec![(1, WireState::Removed)]
    );

    dispatcher.dispatch().unwrap();
    let batch = transport.take_batch().unwrap();
    assert_eq!(states(&batch), vec![(1, WireState::Adding)]);
    assert_eq!((batch[0].x, batch[0].y), (5, 5));
}

#[test]
fn end_and_restart_in_one_frame_still_lift_the_contact() {
    let (mut dispatcher, transport) = dispatcher();
    dispatcher.process_frame([start(1, 0, 0)]).unwrap();
    dispatcher.dispatch().unwrap();
    transport.take_sent();

    dispatcher
        .process_frame([end(1, 0, 0), start(1, 9, 9)])
        .unwrap();
    let mut seen = states(&transport.take_batch().unwrap());
    for _ in 0..2 {
        dispatcher.dispatch().unwrap();
        seen.extend(states(&transport.take_batch().unwrap()));
    }
    assert_eq!(
        seen,
        vec![
            (1, WireState::Removing),
            (1, WireState::Removed),
            (1, WireState::Adding)
        ]
    );
}

#[test]
fn tap_within_one_frame_is_added_before_it_is_lifted() {
    let (mut dispatcher, transport) = dispatcher();
    dispatcher
        .process_frame([start(4, 3, 3), end(4, 3, 3)])
        .unwrap();
    let mut seen = states(&transport.take_batch().unwrap());
    for _ in 0..3 {
        dispatcher.dispatch().unwrap();
        seen.extend(states(&transport.take_batch().unwrap()));
    }
    assert_eq!(
        seen,
        vec![
            (4, WireState::Adding),
            (4, WireState::Removing),
            (4, WireState::Removed)
        ]
    );
    assert_eq!(dispatcher.live_contacts(), 0);
}

#[test]
fn transport_failure_aborts_batch_without_rollback() {
    let (mut dispatcher, transport) = dispatcher();
    dispatcher
        .process_frame([start(1, 0, 0), start(2, 0, 0), start(3, 0, 0)])
        .unwrap();
    transport.take_sent();

    transport.fail_on_send(0);
    let err = dispatcher.dispatch().unwrap_err();
    match err {
        DispatchError::Transport {
            cycle,
            index,
            total,
            source,
        } => {
            assert_eq!(cycle, 2);
            assert_eq!(index, 0);
            assert_eq!(total, 2);
            assert!(matches!(source, TransportError::Io(_)));
        }
    }
    // Nothing after the failing report was delivered.
    assert_eq!(transport.sent_count(), 0);

    // Table advanced anyway; the next cycle is a normal full snapshot.
    dispatcher.dispatch().unwrap();
    let batch = transport.take_batch().unwrap();
    assert_eq!(
        states(&batch),
        vec![
            (1, WireState::Updated),
            (2, WireState::Updated),
            (3, WireState::Updated)
        ]
    );
}

#[test]
fn failure_mid_batch_keeps_earlier_reports() {
    let (mut dispatcher, transport) = dispatcher();
    transport.fail_on_send(1);
    let err = dispatcher
        .process_frame([start(1, 0, 0), start(2, 0, 0), start(3, 0, 0)])
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Transport {
            index: 1,
            total: 2,
            ..
        }
    ));
    assert_eq!(transport.sent_count(), 1);
}

#[test]
fn disconnected_transport_fails_cycle_but_not_dispatcher() {
    let transport = RecordingTransport::new();
    let mut dispatcher = ReportDispatcher::new(InboundQueue::new(), transport.clone());
    assert!(dispatcher.process_frame([start(1, 0, 0)]).is_err());
    dispatcher.connect().unwrap();
    assert!(dispatcher.is_connected());
    dispatcher.dispatch().unwrap();
    assert_eq!(transport.sent_count(), 1);
    dispatcher.disconnect();
    assert_eq!(transport.disconnect_count(), 1);
}

#[test]
fn refused_connect_leaves_dispatcher_detached() {
    let transport = RecordingTransport::new();
    transport.set_fail_on_connect(true);
    let mut dispatcher = ReportDispatcher::new(InboundQueue::new(), transport.clone());
    assert!(dispatcher.connect().is_err());
    assert!(!dispatcher.is_connected());

    transport.set_fail_on_connect(false);
    dispatcher.connect().unwrap();
    assert_eq!(transport.connect_count(), 1);
}

#[test]
fn concurrent_producers_lose_nothing_and_keep_their_order() {
    let queue = InboundQueue::new();
    let producers: Vec<_> = [1u16, 5]
        .into_iter()
        .map(|first| {
            let queue = queue.clone();
            thread::spawn(move || {
                for step in 0..500u16 {
                    let id = first + step % 4;
                    queue.enqueue(moved(id, step, step).into());
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let drained = queue.drain_all();
    assert_eq!(drained.len(), 1000);
    for first in [1u16, 5] {
        let xs: Vec<u16> = drained
            .iter()
            .filter(|e| (first..first + 4).contains(&e.id.get()))
            .map(|e| e.position.x)
            .collect();
        assert_eq!(xs, (0..500).collect::<Vec<_>>());
    }
}

#[test]
fn idle_dispatcher_sends_nothing() {
    let (mut dispatcher, transport) = dispatcher();
    let outcome = dispatcher.dispatch().unwrap();
    assert!(outcome.is_idle());
    assert_eq!(outcome.reports_sent, 0);
    assert_eq!(transport.sent_count(), 0);
}
