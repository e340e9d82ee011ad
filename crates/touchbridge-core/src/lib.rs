// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Host side of the TouchBridge virtual multi-touch digitizer.
//!
//! Producers (one or more input-source threads) describe what they observe
//! as [`ContactEvent`]s and push them through a [`ContactSink`]. A single
//! [`ReportDispatcher`] per device periodically drains the shared
//! [`InboundQueue`], reconciles it against its [`LifecycleTable`], encodes
//! the resulting batch with a [`ReportEncoder`] and hands every report to a
//! [`Transport`].
//!
//! Every live contact is re-sent each cycle even when unchanged, and an
//! ended contact is reported once as `Removing` and once more as `Removed`
//! before it is forgotten. [`DispatchLoop`] runs a dispatcher on its own
//! thread on a fixed tick or per upstream frame.
#![forbid(unsafe_code)]

pub mod clock;
pub mod contact;
pub mod dispatch_loop;
pub mod dispatcher;
pub mod encoder;
pub mod ids;
pub mod queue;
pub mod table;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contact::{
    ContactEvent, ContactId, ContactPhase, ContactSize, LifecycleState, PendingEntry, Position,
};
pub use dispatch_loop::{
    DispatchHandle, DispatchLoop, DispatchLoopError, DispatchPolicy, FrameTrigger,
};
pub use dispatcher::{DispatchError, DispatchOutcome, ReportDispatcher};
pub use encoder::{wire_state, ReportEncoder};
pub use ids::{IdSpan, DEFAULT_ID_SPAN};
pub use queue::{ContactSink, InboundQueue};
pub use table::{LifecycleTable, ReconcileStats};
pub use transport::{parse_hid_id, HidrawTransport, Transport, TransportError};
