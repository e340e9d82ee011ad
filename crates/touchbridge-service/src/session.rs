// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One client connection: newline-delimited JSON in, contact events out.
//!
//! ```text
//! {"type":"contact","id":1,"phase":"start","x":10,"y":20,"width":0,"height":0}
//! {"type":"frame"}
//! ```
//!
//! `id` is local to the connection (`1..=id_span`) and is mapped onto the
//! connection's id span. Contacts still live when the client goes away are
//! ended on its behalf.

use std::collections::BTreeMap;
use std::io::{self, BufRead};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use touchbridge_core::{
    ContactEvent, ContactId, ContactPhase, ContactSink, ContactSize, FrameTrigger, IdSpan,
    Position,
};

/// Something that can ask the dispatcher for a cycle.
pub trait FrameSignal {
    /// Request one cycle; `false` when nobody is listening any more.
    fn frame(&self) -> bool;
}

impl FrameSignal for FrameTrigger {
    fn frame(&self) -> bool {
        Self::frame(self)
    }
}

/// One parsed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientLine {
    /// A contact observation.
    Contact {
        /// Connection-local id, `1..=id_span`.
        id: u16,
        /// Observed phase.
        phase: LinePhase,
        /// Horizontal position.
        x: u16,
        /// Vertical position.
        y: u16,
        /// Footprint width.
        #[serde(default)]
        width: u16,
        /// Footprint height.
        #[serde(default)]
        height: u16,
    },
    /// End of an upstream frame.
    Frame,
}

/// Phase as spelled on the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePhase {
    /// Contact appeared.
    Start,
    /// Contact still present.
    Move,
    /// Contact lifted.
    End,
}

impl From<LinePhase> for ContactPhase {
    fn from(phase: LinePhase) -> Self {
        match phase {
            LinePhase::Start => Self::Start,
            LinePhase::Move => Self::Move,
            LinePhase::End => Self::End,
        }
    }
}

/// A line that was skipped.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Not valid JSON, or not a known message.
    #[error("malformed line: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Local id outside `1..=id_span`.
    #[error("contact id {id} outside 1..={span}")]
    IdOutOfSpan {
        /// Offending local id.
        id: u16,
        /// Span length.
        span: u16,
    },
}

/// What a handled line did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// A contact event was queued.
    Contact(ContactId),
    /// A cycle was requested.
    Frame,
    /// Blank line.
    Empty,
}

/// Per-connection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Contact events queued.
    pub contacts: usize,
    /// Frame signals sent.
    pub frames: usize,
    /// Lines skipped.
    pub rejected: usize,
    /// Contacts ended because the client left.
    pub orphaned: usize,
}

/// State of one connected client.
#[derive(Debug)]
pub struct ClientSession<F> {
    sink: ContactSink,
    span: IdSpan,
    trigger: F,
    live: BTreeMap<ContactId, Position>,
    summary: SessionSummary,
}

impl<F: FrameSignal> ClientSession<F> {
    /// Session feeding `sink` with ids from `span`.
    pub fn new(sink: ContactSink, span: IdSpan, trigger: F) -> Self {
        Self {
            sink,
            span,
            trigger,
            live: BTreeMap::new(),
            summary: SessionSummary::default(),
        }
    }

    /// Parse and act on one line.
    pub fn handle_line(&mut self, line: &str) -> Result<LineOutcome, SessionError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(LineOutcome::Empty);
        }
        match serde_json::from_str(line)? {
            ClientLine::Contact {
                id,
                phase,
                x,
                y,
                width,
                height,
            } => {
                let contact = id
                    .checked_sub(1)
                    .and_then(|slot| self.span.id(slot))
                    .ok_or(SessionError::IdOutOfSpan {
                        id,
                        span: self.span.len(),
                    })?;
                let position = Position::new(x, y);
                let phase = ContactPhase::from(phase);
                if phase == ContactPhase::End {
                    self.live.remove(&contact);
                } else {
                    self.live.insert(contact, position);
                }
                self.sink.submit(
                    ContactEvent::new(contact, phase, position)
                        .with_size(ContactSize { width, height }),
                );
                self.summary.contacts += 1;
                Ok(LineOutcome::Contact(contact))
            }
            ClientLine::Frame => {
                if !self.trigger.frame() {
                    debug!("frame signal dropped, dispatch loop is gone");
                }
                self.summary.frames += 1;
                Ok(LineOutcome::Frame)
            }
        }
    }

    /// Read lines until EOF, skipping bad ones, then end orphaned contacts.
    ///
    /// Orphans are ended even when the connection fails mid-stream.
    pub fn serve<R: BufRead>(mut self, reader: R) -> io::Result<SessionSummary> {
        let mut failure = None;
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            if let Err(err) = self.handle_line(&line) {
                warn!(error = %err, "client line skipped");
                self.summary.rejected += 1;
            }
        }
        let summary = self.finish();
        failure.map_or(Ok(summary), Err)
    }

    /// End every contact the client left behind and return the counters.
    pub fn finish(mut self) -> SessionSummary {
        let orphans = std::mem::take(&mut self.live);
        if !orphans.is_empty() {
            self.summary.orphaned = orphans.len();
            self.sink.submit_frame(
                orphans
                    .into_iter()
                    .map(|(id, position)| ContactEvent::new(id, ContactPhase::End, position)),
            );
            self.trigger.frame();
        }
        self.summary
    }
}
