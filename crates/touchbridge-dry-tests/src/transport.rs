// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording transport fake.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use touchbridge_core::{Transport, TransportError};
use touchbridge_proto::{decode_sequence, ContactRecord, WireError};

/// [`Transport`] that keeps every delivered report in memory.
///
/// Clones share state: hand one clone to the dispatcher and inspect the
/// other from the test. Failed sends are not recorded.
#[derive(Clone, Default, Debug)]
pub struct RecordingTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default, Debug)]
struct Inner {
    connected: bool,
    sent: Vec<Vec<u8>>,
    send_attempts: usize,
    connect_count: usize,
    disconnect_count: usize,
    fail_at: Option<usize>,
    fail_on_connect: bool,
}

impl RecordingTransport {
    /// Disconnected transport with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Already connected transport.
    pub fn connected() -> Self {
        let transport = Self::new();
        transport.lock().connected = true;
        transport
    }

    /// Fail the `nth` send attempt from now (0 = the next one), once.
    pub fn fail_on_send(&self, nth: usize) {
        let mut inner = self.lock();
        inner.fail_at = Some(inner.send_attempts + nth);
    }

    /// Make `connect` fail (or stop failing).
    pub fn set_fail_on_connect(&self, fail: bool) {
        self.lock().fail_on_connect = fail;
    }

    /// Every report delivered so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Number of reports delivered so far.
    pub fn sent_count(&self) -> usize {
        self.lock().sent.len()
    }

    /// Remove and return every report delivered so far.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Take the reports delivered since the last take and decode them as one
    /// report sequence. Nothing delivered decodes as an empty batch.
    pub fn take_batch(&self) -> Result<Vec<ContactRecord>, WireError> {
        let reports = self.take_sent();
        if reports.is_empty() {
            return Ok(Vec::new());
        }
        decode_sequence(&reports)
    }

    /// Successful `connect` calls.
    pub fn connect_count(&self) -> usize {
        self.lock().connect_count
    }

    /// `disconnect` calls.
    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnect_count
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.fail_on_connect {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated connect failure",
            )));
        }
        inner.connected = true;
        inner.connect_count += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut inner = self.lock();
        inner.connected = false;
        inner.disconnect_count += 1;
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn send(&mut self, report: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        let attempt = inner.send_attempts;
        inner.send_attempts += 1;
        if inner.fail_at == Some(attempt) {
            inner.fail_at = None;
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated send failure",
            )));
        }
        inner.sent.push(report.to_vec());
        Ok(())
    }
}
