// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Terse contact event builders.

use touchbridge_core::{ContactEvent, ContactId, ContactPhase, Position};

/// Raw id → [`ContactId`].
///
/// # Panics
///
/// Panics on 0, which is never a valid identity.
#[allow(clippy::panic)]
pub const fn contact_id(raw: u16) -> ContactId {
    match ContactId::new(raw) {
        Some(id) => id,
        None => panic!("contact id 0 is reserved"),
    }
}

/// `Start` event for `id` at `(x, y)`.
pub const fn start(id: u16, x: u16, y: u16) -> ContactEvent {
    ContactEvent::new(contact_id(id), ContactPhase::Start, Position::new(x, y))
}

/// `Move` event for `id` at `(x, y)`.
pub const fn moved(id: u16, x: u16, y: u16) -> ContactEvent {
    ContactEvent::new(contact_id(id), ContactPhase::Move, Position::new(x, y))
}

/// `End` event for `id` at `(x, y)`.
pub const fn end(id: u16, x: u16, y: u16) -> ContactEvent {
    ContactEvent::new(contact_id(id), ContactPhase::End, Position::new(x, y))
}
