// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Multi-touch report framing and sequence validation.
//!
//! A batch of N contacts travels as `ceil(N / K)` reports. Only the first
//! report carries the true contact count; the driver uses it to know how many
//! records the forthcoming sequence holds.

use crate::record::ContactRecord;
use crate::{
    CONTACT_RECORD_SIZE, MAX_CONTACTS_PER_REPORT, REPORT_ID_MULTITOUCH, REPORT_LENGTH,
    TRUE_COUNT_OFFSET,
};

/// Report decode errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Buffer length does not match the pinned layout.
    #[error("bad length: expected {expected} bytes, got {got}")]
    BadLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Leading byte is not the multi-touch report id.
    #[error("bad report id: expected {REPORT_ID_MULTITOUCH:#04x}, got {0:#04x}")]
    BadReportId(u8),

    /// State byte does not name a known wire state.
    #[error("unknown wire state {0:#04x}")]
    UnknownState(u8),

    /// Slot has contact id 0 but is not zero-filled.
    #[error("slot {0} has contact id 0 but is not zero-filled")]
    DirtySlot(usize),

    /// Reserved record byte is non-zero.
    #[error("slot {slot}: reserved byte must be zero, got {value:#04x}")]
    NonZeroReserved {
        /// Slot index inside the report.
        slot: usize,
        /// Offending value.
        value: u8,
    },

    /// An occupied slot follows an empty one.
    #[error("slot {0} is occupied after an empty slot")]
    SlotGap(usize),

    /// Sequence is empty.
    #[error("empty report sequence")]
    EmptySequence,

    /// The first report carries no contacts.
    #[error("first report of a sequence carries no contacts")]
    EmptyFirstReport,

    /// A continuation report carries a non-zero true count.
    #[error("continuation report {index} carries true count {count}")]
    CountInContinuation {
        /// Index of the report inside the sequence.
        index: usize,
        /// Offending count.
        count: u8,
    },

    /// True count in the first report does not match the records delivered.
    #[error("true count {declared} does not match {delivered} delivered records")]
    CountMismatch {
        /// Count declared by the first report.
        declared: u8,
        /// Records found across the sequence.
        delivered: usize,
    },

    /// The same contact id appears twice in one sequence.
    #[error("contact {0} appears twice in one sequence")]
    DuplicateContact(u16),
}

/// One fixed-length multi-touch report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiTouchReport {
    contacts: Vec<ContactRecord>,
    true_contact_count: u8,
}

impl MultiTouchReport {
    /// First report of a sequence announcing `true_contact_count` records.
    pub fn first(true_contact_count: u8) -> Self {
        Self {
            contacts: Vec::with_capacity(MAX_CONTACTS_PER_REPORT),
            true_contact_count,
        }
    }

    /// Continuation report; its trailing count byte is always zero.
    pub fn continuation() -> Self {
        Self::first(0)
    }

    /// Append a record.
    ///
    /// # Panics
    ///
    /// Panics when the report already holds [`MAX_CONTACTS_PER_REPORT`]
    /// records. Callers partition batches before building reports, so this
    /// only fires on a programming error.
    pub fn add_contact(&mut self, record: ContactRecord) {
        assert!(
            self.contacts.len() < MAX_CONTACTS_PER_REPORT,
            "cannot add more than {MAX_CONTACTS_PER_REPORT} contacts to a multi-touch report"
        );
        self.contacts.push(record);
    }

    /// Records carried by this report, in slot order.
    pub fn contacts(&self) -> &[ContactRecord] {
        &self.contacts
    }

    /// Trailing count byte (zero for continuations).
    pub fn true_contact_count(&self) -> u8 {
        self.true_contact_count
    }

    /// Encode to the pinned report layout. Unused slots are zero-filled.
    pub fn to_bytes(&self) -> [u8; REPORT_LENGTH] {
        let mut buf = [0u8; REPORT_LENGTH];
        buf[0] = REPORT_ID_MULTITOUCH;
        for (slot, record) in self.contacts.iter().enumerate() {
            let at = slot_offset(slot);
            buf[at..at + CONTACT_RECORD_SIZE].copy_from_slice(&record.to_bytes());
        }
        buf[TRUE_COUNT_OFFSET] = self.true_contact_count;
        buf
    }

    /// Decode a report. Strict: length, report id, slot contents and slot
    /// packing are all validated.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() != REPORT_LENGTH {
            return Err(WireError::BadLength {
                expected: REPORT_LENGTH,
                got: bytes.len(),
            });
        }
        if bytes[0] != REPORT_ID_MULTITOUCH {
            return Err(WireError::BadReportId(bytes[0]));
        }

        let mut contacts = Vec::with_capacity(MAX_CONTACTS_PER_REPORT);
        let mut seen_empty = false;
        for slot in 0..MAX_CONTACTS_PER_REPORT {
            let at = slot_offset(slot);
            match ContactRecord::from_slot(&bytes[at..at + CONTACT_RECORD_SIZE], slot)? {
                Some(_) if seen_empty => return Err(WireError::SlotGap(slot)),
                Some(record) => contacts.push(record),
                None => seen_empty = true,
            }
        }

        Ok(Self {
            contacts,
            true_contact_count: bytes[TRUE_COUNT_OFFSET],
        })
    }
}

const fn slot_offset(slot: usize) -> usize {
    1 + slot * CONTACT_RECORD_SIZE
}

/// Decode a whole report sequence the way the driver does.
///
/// Checks that the first report announces exactly as many records as the
/// sequence delivers, that continuations carry a zero count, and that no
/// contact id repeats. Returns the records in transmission order.
pub fn decode_sequence<B: AsRef<[u8]>>(reports: &[B]) -> Result<Vec<ContactRecord>, WireError> {
    let Some((first, rest)) = reports.split_first() else {
        return Err(WireError::EmptySequence);
    };

    let head = MultiTouchReport::decode(first.as_ref())?;
    if head.contacts.is_empty() {
        return Err(WireError::EmptyFirstReport);
    }
    let declared = head.true_contact_count;
    let mut records = head.contacts;

    for (offset, bytes) in rest.iter().enumerate() {
        let report = MultiTouchReport::decode(bytes.as_ref())?;
        if report.true_contact_count != 0 {
            return Err(WireError::CountInContinuation {
                index: offset + 1,
                count: report.true_contact_count,
            });
        }
        records.extend(report.contacts);
    }

    // Counts above 255 saturate on the wire.
    let delivered_clamped = u8::try_from(records.len()).unwrap_or(u8::MAX);
    if delivered_clamped != declared {
        return Err(WireError::CountMismatch {
            declared,
            delivered: records.len(),
        });
    }

    let mut ids: Vec<u16> = records.iter().map(|r| r.contact_id).collect();
    ids.sort_unstable();
    if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
        return Err(WireError::DuplicateContact(pair[0]));
    }

    Ok(records)
}
