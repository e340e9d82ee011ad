// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Disjoint contact-id spans for independent input sources.

use crate::contact::ContactId;

/// Default number of ids reserved per source (two hands of two contacts).
pub const DEFAULT_ID_SPAN: u16 = 4;

/// Contiguous block of ids owned by one input source.
///
/// Source `n` (1-based) owns `(n - 1) * len + 1 ..= n * len`, so spans of
/// different sources never overlap and never include 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSpan {
    first: u16,
    len: u16,
}

impl IdSpan {
    /// Span for source number `source` (1-based).
    ///
    /// Returns `None` for source 0, an empty span, or a span that would run
    /// past `u16::MAX`.
    pub fn for_source(source: u16, len: u16) -> Option<Self> {
        if source == 0 || len == 0 {
            return None;
        }
        let first = (source - 1).checked_mul(len)?.checked_add(1)?;
        // Last id must fit as well.
        first.checked_add(len - 1)?;
        Some(Self { first, len })
    }

    /// Number of ids in the span.
    pub const fn len(&self) -> u16 {
        self.len
    }

    /// Spans are never empty; provided for API symmetry with `len`.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Id for `slot` inside the span, `None` when out of range.
    pub fn id(&self, slot: u16) -> Option<ContactId> {
        if slot >= self.len {
            return None;
        }
        ContactId::new(self.first + slot)
    }

    /// True when `id` belongs to this span.
    pub fn contains(&self, id: ContactId) -> bool {
        let raw = id.get();
        raw >= self.first && raw - self.first < self.len
    }

    /// Iterate every id in the span.
    pub fn iter(&self) -> impl Iterator<Item = ContactId> + '_ {
        (0..self.len).filter_map(|slot| self.id(slot))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn first_source_starts_at_one() {
        let span = IdSpan::for_source(1, DEFAULT_ID_SPAN).unwrap();
        let ids: Vec<u16> = span.iter().map(ContactId::get).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn spans_are_disjoint() {
        let a = IdSpan::for_source(1, 4).unwrap();
        let b = IdSpan::for_source(2, 4).unwrap();
        assert_eq!(b.id(0).unwrap().get(), 5);
        for id in a.iter() {
            assert!(!b.contains(id));
        }
        for id in b.iter() {
            assert!(!a.contains(id));
        }
    }

    #[test]
    fn invalid_spans_are_rejected() {
        assert!(IdSpan::for_source(0, 4).is_none());
        assert!(IdSpan::for_source(1, 0).is_none());
        assert!(IdSpan::for_source(u16::MAX, 4).is_none());
        assert!(IdSpan::for_source(1, 4).unwrap().id(4).is_none());
    }
}
