// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The report dispatcher: one cycle drains the queue, reconciles the
//! lifecycle table, encodes the batch and hands every report to the
//! transport in order.
//!
//! There is one dispatcher per logical device. It is the sole drainer of its
//! queue and the sole owner of its table; producers only ever touch the
//! queue through a [`ContactSink`].

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::contact::{ContactEvent, ContactId, LifecycleState};
use crate::encoder::ReportEncoder;
use crate::queue::{ContactSink, InboundQueue};
use crate::table::{LifecycleTable, ReconcileStats};
use crate::transport::{Transport, TransportError};

/// Failure of one dispatch cycle. The dispatcher stays usable.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A report could not be delivered; the rest of the batch was dropped.
    #[error("cycle {cycle}: report {index} of {total} failed: {source}")]
    Transport {
        /// Cycle number.
        cycle: u64,
        /// Zero-based index of the failing report.
        index: usize,
        /// Reports in the batch.
        total: usize,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Cycle number, starting at 1.
    pub cycle: u64,
    /// Contacts in the batch.
    pub contacts: usize,
    /// Reports delivered.
    pub reports_sent: usize,
    /// Reconciliation counters.
    pub stats: ReconcileStats,
}

impl DispatchOutcome {
    /// True when the batch was empty and nothing was sent.
    pub const fn is_idle(&self) -> bool {
        self.contacts == 0
    }
}

/// Drains, reconciles, encodes and transmits.
#[derive(Debug)]
pub struct ReportDispatcher<T, C = SystemClock> {
    queue: InboundQueue,
    table: LifecycleTable,
    encoder: ReportEncoder<C>,
    transport: T,
    cycle: u64,
}

impl<T: Transport> ReportDispatcher<T, SystemClock> {
    /// Dispatcher over `queue` stamping records with wall-clock time.
    pub fn new(queue: InboundQueue, transport: T) -> Self {
        Self::with_clock(queue, transport, SystemClock::new())
    }
}

impl<T: Transport, C: Clock> ReportDispatcher<T, C> {
    /// Dispatcher with an explicit clock.
    pub fn with_clock(queue: InboundQueue, transport: T, clock: C) -> Self {
        Self {
            queue,
            table: LifecycleTable::new(),
            encoder: ReportEncoder::new(clock),
            transport,
            cycle: 0,
        }
    }

    /// New producer handle on this dispatcher's queue.
    pub fn sink(&self) -> ContactSink {
        ContactSink::new(self.queue.clone())
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Cycles run so far.
    pub const fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Current lifecycle state of `id`, if tracked.
    pub fn state(&self, id: ContactId) -> Option<LifecycleState> {
        self.table.state(id)
    }

    /// Number of identities still tracked.
    pub fn live_contacts(&self) -> usize {
        self.table.len()
    }

    /// Attach the transport.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        self.transport.connect()?;
        info!("dispatcher connected");
        Ok(())
    }

    /// Detach the transport.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        info!("dispatcher disconnected");
    }

    /// True while the transport is attached.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Run one cycle.
    ///
    /// On a transport failure the remaining reports of the batch are not
    /// sent and the table is not rolled back; the next cycle reconciles from
    /// the updated table as usual.
    #[instrument(level = "debug", skip(self), fields(cycle = self.cycle + 1))]
    pub fn dispatch(&mut self) -> Result<DispatchOutcome, DispatchError> {
        self.cycle += 1;
        let cycle = self.cycle;

        let drained = self.queue.drain_all();
        let (batch, stats) = self.table.reconcile(drained);
        let reports = self.encoder.encode(&batch);
        let total = reports.len();

        for (index, report) in reports.iter().enumerate() {
            if let Err(source) = self.transport.send(&report.to_bytes()) {
                warn!(cycle, index, total, error = %source, "report send failed, batch aborted");
                return Err(DispatchError::Transport {
                    cycle,
                    index,
                    total,
                    source,
                });
            }
        }

        debug!(
            contacts = batch.len(),
            reports = total,
            drained = stats.drained,
            discarded = stats.discarded,
            deferred = stats.deferred,
            deleted = stats.deleted,
            "cycle complete"
        );
        Ok(DispatchOutcome {
            cycle,
            contacts: batch.len(),
            reports_sent: total,
            stats,
        })
    }

    /// Frame policy: queue every event of one upstream frame, then run a
    /// cycle.
    pub fn process_frame<I>(&mut self, events: I) -> Result<DispatchOutcome, DispatchError>
    where
        I: IntoIterator<Item = ContactEvent>,
    {
        self.sink().submit_frame(events);
        self.dispatch()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::clock::ManualClock;
    use crate::contact::{ContactPhase, Position};

    #[derive(Default)]
    struct VecTransport {
        connected: bool,
        sent: Vec<Vec<u8>>,
    }

    impl Transport for VecTransport {
        fn connect(&mut self) -> Result<(), TransportError> {
            self.connected = true;
            Ok(())
        }
        fn disconnect(&mut self) {
            self.connected = false;
        }
        fn is_connected(&self) -> bool {
            self.connected
        }
        fn send(&mut self, report: &[u8]) -> Result<(), TransportError> {
            self.sent.push(report.to_vec());
            Ok(())
        }
    }

    fn event(id: u16, phase: ContactPhase) -> ContactEvent {
        ContactEvent::new(ContactId::new(id).unwrap(), phase, Position::new(1, 1))
    }

    #[test]
    fn cycles_are_numbered_and_idle_cycles_send_nothing() {
        let mut dispatcher = ReportDispatcher::with_clock(
            InboundQueue::new(),
            VecTransport::default(),
            ManualClock::default(),
        );
        dispatcher.connect().unwrap();
        let idle = dispatcher.dispatch().unwrap();
        assert!(idle.is_idle());
        assert_eq!(idle.cycle, 1);

        let outcome = dispatcher
            .process_frame([
                event(1, ContactPhase::Start),
                event(2, ContactPhase::Start),
                event(3, ContactPhase::Start),
            ])
            .unwrap();
        assert_eq!(outcome.cycle, 2);
        assert_eq!(outcome.contacts, 3);
        assert_eq!(outcome.reports_sent, 2);
        assert_eq!(dispatcher.transport().sent.len(), 2);
        assert_eq!(dispatcher.live_contacts(), 3);
    }

    #[test]
    fn connect_and_disconnect_pass_through() {
        let mut dispatcher = ReportDispatcher::new(InboundQueue::new(), VecTransport::default());
        assert!(!dispatcher.is_connected());
        dispatcher.connect().unwrap();
        assert!(dispatcher.is_connected());
        dispatcher.disconnect();
        assert!(!dispatcher.transport().connected);
    }
}
