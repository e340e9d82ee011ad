// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Contact events as producers see them, and lifecycle entries as the
//! dispatcher tracks them.

use std::fmt;
use std::num::NonZeroU16;

/// Identity of one tracked contact.
///
/// Unique within one input source's span (see [`crate::IdSpan`]). Zero is
/// reserved for empty report slots, so identities are never zero.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ContactId(NonZeroU16);

impl ContactId {
    /// Wrap a raw id. Returns `None` for 0.
    pub const fn new(raw: u16) -> Option<Self> {
        match NonZeroU16::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Raw id as written on the wire.
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the producer observed this instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    /// Contact appeared.
    Start,
    /// Contact still present (possibly moved).
    Move,
    /// Contact lifted.
    End,
}

/// Position in device-resolution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: u16,
    /// Vertical coordinate.
    pub y: u16,
}

impl Position {
    /// Build a position.
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Contact footprint in device-resolution units. Zero means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContactSize {
    /// Footprint width.
    pub width: u16,
    /// Footprint height.
    pub height: u16,
}

/// One observed contact at one instant. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// Contact identity.
    pub id: ContactId,
    /// Observed phase.
    pub phase: ContactPhase,
    /// Observed position.
    pub position: Position,
    /// Observed footprint.
    pub size: ContactSize,
}

impl ContactEvent {
    /// Event with an unknown footprint.
    pub const fn new(id: ContactId, phase: ContactPhase, position: Position) -> Self {
        Self {
            id,
            phase,
            position,
            size: ContactSize {
                width: 0,
                height: 0,
            },
        }
    }

    /// Attach a footprint.
    pub const fn with_size(mut self, size: ContactSize) -> Self {
        self.size = size;
        self
    }
}

/// Bookkeeping phase of a tracked contact.
///
/// The only legal path is `Adding → Updated* → Removing → Removed`, after
/// which the entry is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// First pass after the contact appeared.
    Adding,
    /// Contact is live.
    Updated,
    /// Source signalled the end; removal pending.
    Removing,
    /// Final pass; the entry is deleted right after it is reported.
    Removed,
}

impl LifecycleState {
    /// True for `Removing` and `Removed`: the identity is considered gone.
    pub const fn is_ending(self) -> bool {
        matches!(self, Self::Removing | Self::Removed)
    }
}

impl From<ContactPhase> for LifecycleState {
    fn from(phase: ContactPhase) -> Self {
        match phase {
            ContactPhase::Start => Self::Adding,
            ContactPhase::Move => Self::Updated,
            ContactPhase::End => Self::Removing,
        }
    }
}

/// Unit placed on the inbound queue and stored in the lifecycle table.
///
/// Carries no timestamp: the encoder stamps records when they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    /// Contact identity.
    pub id: ContactId,
    /// Declared lifecycle state.
    pub state: LifecycleState,
    /// Last known position.
    pub position: Position,
    /// Last known footprint.
    pub size: ContactSize,
}

impl PendingEntry {
    /// Same entry with a different state.
    pub const fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }
}

impl From<ContactEvent> for PendingEntry {
    fn from(event: ContactEvent) -> Self {
        Self {
            id: event.id,
            state: event.phase.into(),
            position: event.position,
            size: event.size,
        }
    }
}
