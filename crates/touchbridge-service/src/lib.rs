// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Building blocks of the TouchBridge service daemon: flag handling, client
//! sessions and per-client id spans. The binary wires them to a Unix socket
//! and a dispatch loop.

pub mod cli;
pub mod session;
pub mod sources;

pub use cli::{policy_for, saved_prefs, Args};
pub use session::{ClientSession, FrameSignal, SessionError, SessionSummary};
pub use sources::{SourceLease, SourceRegistry};
