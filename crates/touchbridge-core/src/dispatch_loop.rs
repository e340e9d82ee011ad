// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runs a [`ReportDispatcher`] on its own thread, either on a fixed tick or
//! once per upstream frame signal.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dispatcher::ReportDispatcher;
use crate::queue::ContactSink;
use crate::transport::Transport;

/// When the dispatcher runs a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// One cycle per interval.
    Tick(Duration),
    /// One cycle per [`DispatchHandle::frame`] call.
    Frame,
}

/// Errors surfaced when stopping the loop.
#[derive(Debug, Error)]
pub enum DispatchLoopError {
    /// The dispatcher thread panicked; the dispatcher is lost.
    #[error("dispatch thread panicked")]
    Panicked,
    /// The dispatcher thread could not be spawned.
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug)]
enum Signal {
    Frame,
    Stop,
}

/// Spawner for the dispatch thread.
#[derive(Debug)]
pub struct DispatchLoop;

impl DispatchLoop {
    /// Move `dispatcher` onto a new thread driven by `policy`.
    ///
    /// Cycle errors are logged and the loop keeps running.
    pub fn spawn<T, C>(
        dispatcher: ReportDispatcher<T, C>,
        policy: DispatchPolicy,
    ) -> Result<DispatchHandle<T, C>, DispatchLoopError>
    where
        T: Transport + Send + 'static,
        C: Clock + Send + 'static,
    {
        let sink = dispatcher.sink();
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("touchbridge-dispatch".into())
            .spawn(move || {
                let mut dispatcher = dispatcher;
                info!(?policy, "dispatch loop started");
                match policy {
                    DispatchPolicy::Tick(interval) => {
                        let mut deadline = Instant::now() + interval;
                        loop {
                            let wait = deadline.saturating_duration_since(Instant::now());
                            match rx.recv_timeout(wait) {
                                Err(RecvTimeoutError::Timeout) => {
                                    run_cycle(&mut dispatcher);
                                    deadline += interval;
                                    // Fell behind: resynchronise instead of bursting.
                                    let now = Instant::now();
                                    if deadline < now {
                                        deadline = now + interval;
                                    }
                                }
                                Ok(Signal::Frame) => debug!("frame signal ignored in tick mode"),
                                Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                            }
                        }
                    }
                    DispatchPolicy::Frame => {
                        while let Ok(Signal::Frame) = rx.recv() {
                            run_cycle(&mut dispatcher);
                        }
                    }
                }
                info!(cycles = dispatcher.cycles(), "dispatch loop stopped");
                dispatcher
            })?;
        Ok(DispatchHandle {
            trigger: FrameTrigger { tx },
            thread,
            sink,
            policy,
        })
    }
}

fn run_cycle<T: Transport, C: Clock>(dispatcher: &mut ReportDispatcher<T, C>) {
    if let Err(err) = dispatcher.dispatch() {
        warn!(error = %err, "dispatch cycle failed");
    }
}

/// Control handle for a running dispatch loop.
///
/// Dropping the handle without [`DispatchHandle::stop`] also ends the loop,
/// but the dispatcher is then dropped on its thread.
#[derive(Debug)]
pub struct DispatchHandle<T, C> {
    trigger: FrameTrigger,
    thread: JoinHandle<ReportDispatcher<T, C>>,
    sink: ContactSink,
    policy: DispatchPolicy,
}

impl<T, C> DispatchHandle<T, C> {
    /// Producer handle on the running dispatcher's queue.
    pub fn sink(&self) -> ContactSink {
        self.sink.clone()
    }

    /// Policy the loop was started with.
    pub const fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Request one cycle (frame mode). Returns `false` once the loop has
    /// exited.
    pub fn frame(&self) -> bool {
        self.trigger.frame()
    }

    /// Cloneable frame signal for producer threads.
    pub fn trigger(&self) -> FrameTrigger {
        self.trigger.clone()
    }

    /// Stop after the current cycle and hand the dispatcher back.
    pub fn stop(self) -> Result<ReportDispatcher<T, C>, DispatchLoopError> {
        // A closed channel means the loop is already gone; the join below
        // reports how it ended.
        self.trigger.tx.send(Signal::Stop).ok();
        self.thread.join().map_err(|_| DispatchLoopError::Panicked)
    }
}

/// Frame signal that can be cloned into producer threads.
///
/// Ignored by loops running [`DispatchPolicy::Tick`].
#[derive(Debug, Clone)]
pub struct FrameTrigger {
    tx: Sender<Signal>,
}

impl FrameTrigger {
    /// Request one cycle. Returns `false` once the loop has exited.
    pub fn frame(&self) -> bool {
        self.tx.send(Signal::Frame).is_ok()
    }
}
