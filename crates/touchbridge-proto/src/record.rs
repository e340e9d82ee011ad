// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Contact record codec.
//!
//! Record layout (little-endian, 16 bytes):
//! ```text
//! offset size  field
//! 0      1     wire state (bit set, see [`WireState`])
//! 1      1     reserved = 0
//! 2      2     contact id = u16 LE (non-zero)
//! 4      2     x = u16 LE
//! 6      2     y = u16 LE
//! 8      2     width = u16 LE
//! 10     2     height = u16 LE
//! 12     4     timestamp = u32 LE (ms since transmitter epoch, wrapping)
//! ```
//!
//! An all-zero slot is an empty slot. Contact id 0 is therefore reserved.

use crate::wire::WireError;
use crate::CONTACT_RECORD_SIZE;

/// Driver-side contact state carried in the first byte of a record.
///
/// Values are bit sets over [`WireState::TIP_SWITCH`], [`WireState::IN_RANGE`]
/// and [`WireState::NEW_CONTACT`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireState {
    /// Contact lifted and gone; sent exactly once.
    Removed = 0x00,
    /// Tip released, contact still in range.
    Removing = 0x02,
    /// Tip down, contact known to the driver.
    Updated = 0x03,
    /// Tip down, first report for this contact.
    Adding = 0x07,
}

impl WireState {
    /// Tip switch bit.
    pub const TIP_SWITCH: u8 = 1 << 0;
    /// In-range bit.
    pub const IN_RANGE: u8 = 1 << 1;
    /// New-contact bit (only with tip + range).
    pub const NEW_CONTACT: u8 = 1 << 2;

    /// Raw byte value.
    #[inline]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Parse a state byte.
    pub const fn from_byte(byte: u8) -> Result<Self, WireError> {
        match byte {
            0x00 => Ok(Self::Removed),
            0x02 => Ok(Self::Removing),
            0x03 => Ok(Self::Updated),
            0x07 => Ok(Self::Adding),
            other => Err(WireError::UnknownState(other)),
        }
    }

    /// True while the tip switch is down.
    #[inline]
    pub const fn tip_switch(self) -> bool {
        self.to_byte() & Self::TIP_SWITCH != 0
    }

    /// True while the contact is in range.
    #[inline]
    pub const fn in_range(self) -> bool {
        self.to_byte() & Self::IN_RANGE != 0
    }
}

/// One contact as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactRecord {
    /// Driver-side state.
    pub state: WireState,
    /// Contact identity (never zero).
    pub contact_id: u16,
    /// Horizontal position in device units.
    pub x: u16,
    /// Vertical position in device units.
    pub y: u16,
    /// Contact width in device units.
    pub width: u16,
    /// Contact height in device units.
    pub height: u16,
    /// Milliseconds since the transmitter epoch, captured at encode time.
    pub timestamp_ms: u32,
}

impl ContactRecord {
    /// Encode into a fixed 16-byte record.
    pub fn to_bytes(&self) -> [u8; CONTACT_RECORD_SIZE] {
        let mut buf = [0u8; CONTACT_RECORD_SIZE];
        buf[0] = self.state.to_byte();
        // buf[1] reserved
        buf[2..4].copy_from_slice(&self.contact_id.to_le_bytes());
        buf[4..6].copy_from_slice(&self.x.to_le_bytes());
        buf[6..8].copy_from_slice(&self.y.to_le_bytes());
        buf[8..10].copy_from_slice(&self.width.to_le_bytes());
        buf[10..12].copy_from_slice(&self.height.to_le_bytes());
        buf[12..16].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        buf
    }

    /// Decode one record slot.
    ///
    /// Returns `Ok(None)` for an all-zero (empty) slot. `slot` is only used
    /// to label errors.
    pub fn from_slot(bytes: &[u8], slot: usize) -> Result<Option<Self>, WireError> {
        if bytes.len() != CONTACT_RECORD_SIZE {
            return Err(WireError::BadLength {
                expected: CONTACT_RECORD_SIZE,
                got: bytes.len(),
            });
        }
        let contact_id = read_u16(bytes, 2);
        if contact_id == 0 {
            if bytes.iter().all(|b| *b == 0) {
                return Ok(None);
            }
            return Err(WireError::DirtySlot(slot));
        }
        if bytes[1] != 0 {
            return Err(WireError::NonZeroReserved { slot, value: bytes[1] });
        }
        Ok(Some(Self {
            state: WireState::from_byte(bytes[0])?,
            contact_id,
            x: read_u16(bytes, 4),
            y: read_u16(bytes, 6),
            width: read_u16(bytes, 8),
            height: read_u16(bytes, 10),
            timestamp_ms: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }))
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}
