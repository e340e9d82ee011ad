// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Source-number allocation for connected clients.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use touchbridge_core::IdSpan;

/// Hands out the lowest free source number, so a reconnecting client gets
/// its old id span back when nobody took it in between.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    span_len: u16,
    taken: Arc<Mutex<BTreeSet<u16>>>,
}

impl SourceRegistry {
    /// Registry for spans of `span_len` ids.
    pub fn new(span_len: u16) -> Self {
        Self {
            span_len,
            taken: Arc::default(),
        }
    }

    /// Claim a source, or `None` when every span that fits in `u16` is taken.
    pub fn acquire(&self) -> Option<SourceLease> {
        let mut taken = self.lock();
        let mut source = 1u16;
        loop {
            let span = IdSpan::for_source(source, self.span_len)?;
            if taken.insert(source) {
                return Some(SourceLease {
                    source,
                    span,
                    registry: self.clone(),
                });
            }
            source = source.checked_add(1)?;
        }
    }

    /// Sources currently claimed.
    pub fn active(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<u16>> {
        self.taken.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A claimed source number; released on drop.
#[derive(Debug)]
pub struct SourceLease {
    source: u16,
    span: IdSpan,
    registry: SourceRegistry,
}

impl SourceLease {
    /// 1-based source number.
    pub const fn source(&self) -> u16 {
        self.source
    }

    /// Ids owned by this source.
    pub const fn span(&self) -> IdSpan {
        self.span
    }
}

impl Drop for SourceLease {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.source);
    }
}
