//! Scheduler state and the decisions made under the session lock.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::assemble::{self, AssembleError};
use super::{DownloadStatus, Inner};
use crate::outcome::ConnectionOutcome;
use crate::part::{Part, PartObserver, PartStatus};

/// Everything the scheduler mutates. Only accessed under `Inner::session`.
#[derive(Debug, Default)]
pub(super) struct Session {
    pub(super) probe: Option<Part>,
    /// Ascending byte order; this is the concatenation order.
    pub(super) parts: Vec<Part>,
    pub(super) active: usize,
    pub(super) succeeded: usize,
    /// Shared by all parts of the session.
    pub(super) retries: u32,
    pub(super) peak_active: usize,
}

impl Session {
    fn next_waiting(&self) -> Option<Part> {
        self.parts
            .iter()
            .find(|p| p.status() == PartStatus::WaitingToStart)
            .cloned()
    }

    /// Cancel the probe and every part.
    pub(super) fn cancel_all(&self) {
        if let Some(probe) = &self.probe {
            probe.cancel();
        }
        for part in &self.parts {
            part.cancel();
        }
    }
}

impl Inner {
    /// Fill free connection slots with waiting parts, in list order.
    pub(super) fn dispatch_locked(self: &Arc<Self>, session: &mut Session) {
        if self.is_cancelled() || session.retries > self.retry_count {
            return;
        }
        while session.active < self.connection_count {
            let Some(part) = session.next_waiting() else {
                break;
            };
            part.set_status(PartStatus::InProgress);
            session.active += 1;
            session.peak_active = session.peak_active.max(session.active);

            let inner = Arc::clone(self);
            let job_part = part.clone();
            let submitted = self.pool.submit(move || inner.run_part(&job_part));
            if submitted.is_err() {
                tracing::error!(part = %part.name(), "worker pool closed, part not dispatched");
                part.set_status(PartStatus::WaitingToStart);
                session.active -= 1;
                break;
            }
            tracing::debug!(part = %part.name(), active = session.active, "part dispatched");
        }
    }

    /// Pool job for one part. A panic inside the transport is reported as a
    /// failed attempt so the part still produces exactly one finished event.
    fn run_part(&self, part: &Part) {
        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            part.run(self.transport.as_ref(), &self.settings, self)
        }));
        if run.is_err() {
            tracing::error!(part = %part.name(), "part worker panicked");
            part.set_status(PartStatus::Errored(ConnectionOutcome::Failure));
            self.finished(part, false, ConnectionOutcome::Failure);
        }
    }

    /// Handle one part's terminal event. Called from the finished lane only.
    pub(super) fn on_part_finished(self: &Arc<Self>, part: &Part, outcome: ConnectionOutcome) {
        let mut session = self.lock_session();
        session.active = session.active.saturating_sub(1);

        if self.is_cancelled() {
            drop(session);
            // Late parts may have recreated files after the first cleanup.
            self.cleanup_temp();
            return;
        }

        if outcome.is_success() {
            session.succeeded += 1;
            if session.succeeded == session.parts.len() {
                let parts = session.parts.clone();
                drop(session);
                self.assemble(&parts);
            } else {
                self.dispatch_locked(&mut session);
            }
            return;
        }

        if outcome == ConnectionOutcome::NoConnectivity {
            tracing::warn!(part = %part.name(), "no connectivity, aborting download");
            self.abort_locked(&session);
            drop(session);
            self.cleanup_temp();
            self.finish(error_status(part));
            return;
        }

        session.retries += 1;
        self.rewind_progress(part.downloaded());
        if session.retries <= self.retry_count {
            tracing::info!(
                part = %part.name(),
                retry = session.retries,
                budget = self.retry_count,
                "retrying part after {outcome}"
            );
            part.remove_file();
            let renewed = part.renewed();
            match session.parts.iter().position(|p| p.same_as(part)) {
                Some(idx) => session.parts[idx] = renewed,
                None => tracing::warn!(part = %part.name(), "finished part not in plan"),
            }
            self.dispatch_locked(&mut session);
        } else {
            tracing::warn!(
                part = %part.name(),
                retries = session.retries,
                "retry budget exhausted after {outcome}"
            );
            session.parts.retain(|p| !p.same_as(part));
            self.abort_locked(&session);
            drop(session);
            self.cleanup_temp();
            self.finish(error_status(part));
        }
    }

    /// Stop scheduling and cancel everything in flight.
    pub(super) fn abort_locked(&self, session: &Session) {
        self.set_cancelled();
        session.cancel_all();
    }

    fn assemble(&self, parts: &[Part]) {
        tracing::debug!(parts = parts.len(), dest = %self.destination.display(), "assembling");
        let result = assemble::concatenate(parts, &self.destination, &self.cancelled);
        self.cleanup_temp();
        match result {
            Ok(bytes) => {
                tracing::info!(bytes, dest = %self.destination.display(), "download assembled");
                if !self.finish_with_progress(DownloadStatus::Successful, Some(bytes)) {
                    // Cancelled while the last copy ran; leave nothing behind.
                    let _ = std::fs::remove_file(&self.destination);
                }
            }
            Err(AssembleError::Cancelled) => {
                tracing::debug!("assembly stopped by cancellation");
            }
            Err(e) => {
                tracing::error!("could not make output file: {e}");
                self.finish(DownloadStatus::CouldNotMakeFile);
            }
        }
    }
}

fn error_status(part: &Part) -> DownloadStatus {
    DownloadStatus::ErrorOccurred {
        response: part.response(),
        error: part.error(),
    }
}
