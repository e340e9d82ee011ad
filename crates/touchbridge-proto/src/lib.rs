// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire layout for the TouchBridge virtual multi-touch digitizer.
//!
//! Every report the host sends to the virtual HID driver has the same fixed
//! length. A report carries up to [`MAX_CONTACTS_PER_REPORT`] contact records
//! and a trailing byte holding the *true contact count* of the whole report
//! sequence (only in the first report; continuations carry zero).
//!
//! Report layout (little-endian):
//!
//! ```text
//! offset size  field
//! 0      1     report id = 0x01 (multi-touch)
//! 1      16    contact record, slot 0
//! 17     16    contact record, slot 1
//! 33     1     true contact count (first report only, else 0)
//! ```
//!
//! See [`record`] for the per-contact layout and [`wire`] for report
//! encode/decode and sequence validation. The layout is paired with the
//! driver and must stay byte-stable.
#![forbid(unsafe_code)]

pub mod record;
pub mod wire;

pub use record::{ContactRecord, WireState};
pub use wire::{decode_sequence, MultiTouchReport, WireError};

/// Vendor id the virtual HID driver enumerates with.
pub const DRIVER_VENDOR_ID: u16 = 0xdddd;

/// Product id the virtual HID driver enumerates with.
pub const DRIVER_PRODUCT_ID: u16 = 0x0001;

/// Report id of the multi-touch input report.
pub const REPORT_ID_MULTITOUCH: u8 = 0x01;

/// Hard limit of contact records in a single report.
pub const MAX_CONTACTS_PER_REPORT: usize = 2;

/// Width of one contact record in bytes.
pub const CONTACT_RECORD_SIZE: usize = 16;

/// Total length of one report: id byte, record slots, trailing count byte.
pub const REPORT_LENGTH: usize = 1 + MAX_CONTACTS_PER_REPORT * CONTACT_RECORD_SIZE + 1;

/// Offset of the trailing true-contact-count byte.
pub const TRUE_COUNT_OFFSET: usize = REPORT_LENGTH - 1;

/// Number of reports needed to carry `contacts` records.
///
/// Zero contacts need zero reports: an empty batch is never transmitted.
pub const fn reports_for(contacts: usize) -> usize {
    contacts.div_ceil(MAX_CONTACTS_PER_REPORT)
}
