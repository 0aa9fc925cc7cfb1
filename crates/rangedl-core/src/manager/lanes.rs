//! Ordered notification lanes.
//!
//! Each category of part event gets its own channel drained by one thread, so
//! events are handled in order within a category and one at a time. There is
//! no ordering across categories.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use std::thread;

use super::Inner;
use crate::outcome::ConnectionOutcome;
use crate::part::Part;

pub(super) struct Lanes {
    pub(super) started: Sender<Part>,
    pub(super) response: Sender<(Part, u32)>,
    pub(super) progress: Sender<u64>,
    pub(super) finished: Sender<(Part, ConnectionOutcome)>,
}

pub(super) struct LaneReceivers {
    started: Receiver<Part>,
    response: Receiver<(Part, u32)>,
    progress: Receiver<u64>,
    finished: Receiver<(Part, ConnectionOutcome)>,
}

pub(super) fn channels() -> (Lanes, LaneReceivers) {
    let (started_tx, started_rx) = mpsc::channel();
    let (response_tx, response_rx) = mpsc::channel();
    let (progress_tx, progress_rx) = mpsc::channel();
    let (finished_tx, finished_rx) = mpsc::channel();
    (
        Lanes {
            started: started_tx,
            response: response_tx,
            progress: progress_tx,
            finished: finished_tx,
        },
        LaneReceivers {
            started: started_rx,
            response: response_rx,
            progress: progress_rx,
            finished: finished_rx,
        },
    )
}

impl LaneReceivers {
    /// Start one drain thread per lane. Threads hold a weak reference and exit
    /// once the manager is gone and its senders are dropped.
    pub(super) fn spawn(self, inner: Weak<Inner>) -> io::Result<()> {
        drain("rangedl-started", self.started, inner.clone(), |_, part| {
            tracing::trace!(part = %part.name(), "part started");
        })?;
        drain("rangedl-response", self.response, inner.clone(), |_, (part, status)| {
            tracing::debug!(
                part = %part.name(),
                status,
                range = ?part.range().map(|r| r.header_value()),
                size = part.range_size(),
                "part got response"
            );
        })?;
        drain("rangedl-progress", self.progress, inner.clone(), |inner, delta| {
            inner.on_progress(delta);
        })?;
        drain("rangedl-finished", self.finished, inner, |inner, (part, outcome)| {
            inner.on_part_finished(&part, outcome);
        })?;
        Ok(())
    }
}

fn drain<T: Send + 'static>(
    name: &str,
    rx: Receiver<T>,
    inner: Weak<Inner>,
    handle: fn(&Arc<Inner>, T),
) -> io::Result<()> {
    thread::Builder::new().name(name.to_string()).spawn(move || {
        while let Ok(event) = rx.recv() {
            let Some(inner) = inner.upgrade() else { break };
            handle(&inner, event);
        }
    })?;
    Ok(())
}
