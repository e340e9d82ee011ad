// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! TouchBridge replay harness.
//!
//! Feeds JSON scenarios through a real dispatcher with a hand-driven clock
//! and checks the exact report bytes against golden files, so any change to
//! lifecycle reconciliation or the wire layout shows up as a byte diff.

pub mod replay;
