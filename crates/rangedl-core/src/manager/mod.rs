//! Download orchestration: probe, range plan, bounded dispatch, retry and
//! cancel policy, and final reassembly.
//!
//! Parts run on a fixed worker pool. Their events come back through ordered
//! lanes (see `lanes`), and every scheduling decision is taken under one
//! session lock. The terminal status is published exactly once.

mod assemble;
mod builder;
mod lanes;
mod listener;
mod plan;
mod pool;
mod probe;
mod session;
mod status;

pub use builder::{ManagerBuilder, ManagerError};
pub use listener::{ChannelListener, DownloadEvent, DownloadListener};
pub use probe::{probe, ProbeReport};
pub use status::{DownloadPhase, DownloadStatus};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tempfile::TempDir;

use crate::config::RangedlConfig;
use crate::outcome::ConnectionOutcome;
use crate::part::{Part, PartObserver, RunSettings};
use crate::transport::{ResponseHead, Transport};
use lanes::Lanes;
use pool::WorkerPool;
use session::Session;
use status::FinishLatch;

/// Downloads one URL to one destination file.
///
/// Dropping a manager that was started but has not finished cancels it.
pub struct DownloadManager {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    destination: PathBuf,
    tag: Option<String>,
    connection_count: usize,
    retry_count: u32,
    config: RangedlConfig,
    settings: RunSettings,
    transport: Arc<dyn Transport>,
    listener: Arc<dyn DownloadListener>,
    temp_dir: Mutex<Option<TempDir>>,
    temp_path: PathBuf,
    session: Mutex<Session>,
    started: AtomicBool,
    cancelled: AtomicBool,
    finish_claimed: AtomicBool,
    latch: FinishLatch,
    file_size: AtomicI64,
    /// May dip below zero briefly while a retried part's bytes are rewound.
    total_read: AtomicI64,
    phase: Mutex<DownloadPhase>,
    pool: WorkerPool,
    lanes: Lanes,
}

impl DownloadManager {
    pub fn builder(url: impl Into<String>, destination: impl Into<PathBuf>) -> ManagerBuilder {
        ManagerBuilder::new(url.into(), destination.into())
    }

    /// Begin the download in the background. Calling it again has no effect.
    pub fn start(&self) {
        let inner = &self.inner;
        if inner.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(url = %inner.url, "start called twice");
            return;
        }
        if inner.is_cancelled() {
            return;
        }
        inner.notify_phase(DownloadPhase::Started);
        inner.notify_phase(DownloadPhase::GettingInformation);

        let probe = Part::probe(inner.url.clone(), inner.config.probe_upper_bound);
        {
            let mut session = inner.lock_session();
            // cancel() sets the flag before locking: it either sees the probe or we see the flag.
            if inner.is_cancelled() {
                return;
            }
            session.probe = Some(probe.clone());
        }
        let job_inner = Arc::clone(inner);
        if inner
            .pool
            .submit(move || job_inner.run_probe_guarded(probe))
            .is_err()
        {
            tracing::error!("worker pool closed before probe");
            inner.cleanup_temp();
            inner.finish(DownloadStatus::ErrorOccurred {
                response: None,
                error: None,
            });
        }
    }

    /// Stop the download. A user-initiated cancel reports `Cancelled` right away;
    /// either way all parts are aborted and the temp directory is removed.
    /// Safe to call more than once.
    pub fn cancel(&self, user_initiated: bool) {
        self.inner.cancel(user_initiated);
    }

    /// Block until the terminal status is published.
    ///
    /// Never returns for a manager that is neither started nor cancelled.
    pub fn wait(&self) -> DownloadStatus {
        self.inner.latch.wait()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<DownloadStatus> {
        self.inner.latch.wait_timeout(timeout)
    }

    /// Terminal status, once finished.
    pub fn status(&self) -> Option<DownloadStatus> {
        self.inner.latch.get()
    }

    pub fn phase(&self) -> DownloadPhase {
        *self.inner.lock_phase()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finish_claimed.load(Ordering::Acquire)
    }

    /// Retries consumed from the shared budget so far.
    pub fn retries_used(&self) -> u32 {
        self.inner.lock_session().retries
    }

    /// Number of parts in the current plan (0 before the probe finishes).
    pub fn parts_planned(&self) -> usize {
        self.inner.lock_session().parts.len()
    }

    /// Highest number of parts dispatched at the same time.
    pub fn peak_active(&self) -> usize {
        self.inner.lock_session().peak_active
    }

    /// Whole-file size learned by the probe, `-1` until known.
    pub fn file_size(&self) -> i64 {
        self.inner.file_size.load(Ordering::Acquire)
    }

    pub fn downloaded(&self) -> u64 {
        self.inner.downloaded()
    }

    pub fn tag(&self) -> Option<&str> {
        self.inner.tag.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn destination(&self) -> &Path {
        &self.inner.destination
    }

    /// Session temp directory holding part files. Gone once finished.
    pub fn temp_path(&self) -> &Path {
        &self.inner.temp_path
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        let inner = &self.inner;
        if inner.started.load(Ordering::Acquire) && !inner.finish_claimed.load(Ordering::Acquire) {
            tracing::debug!(url = %inner.url, "manager dropped while running, cancelling");
            inner.cancel(true);
        }
    }
}

impl Inner {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn set_cancelled(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_phase(&self) -> MutexGuard<'_, DownloadPhase> {
        self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// `Finished` is final; later phase updates are ignored.
    fn set_phase(&self, phase: DownloadPhase) {
        let mut current = self.lock_phase();
        if *current != DownloadPhase::Finished {
            *current = phase;
        }
    }

    fn notify_phase(&self, phase: DownloadPhase) {
        self.set_phase(phase);
        self.listener.on_started(phase);
    }

    fn set_file_size(&self, size: i64) {
        self.file_size.store(size, Ordering::Release);
    }

    fn downloaded(&self) -> u64 {
        self.total_read.load(Ordering::Acquire).max(0) as u64
    }

    fn on_progress(&self, delta: u64) {
        let delta = i64::try_from(delta).unwrap_or(i64::MAX);
        self.total_read.fetch_add(delta, Ordering::AcqRel);
        if self.finish_claimed.load(Ordering::Acquire) {
            return;
        }
        self.listener
            .on_progress(self.downloaded(), self.file_size.load(Ordering::Acquire));
    }

    /// Take back bytes counted for a part that will be downloaded again.
    fn rewind_progress(&self, bytes: u64) {
        let bytes = i64::try_from(bytes).unwrap_or(i64::MAX);
        self.total_read.fetch_sub(bytes, Ordering::AcqRel);
    }

    fn cancel(&self, user_initiated: bool) {
        if user_initiated {
            self.finish(DownloadStatus::Cancelled);
        }
        self.set_cancelled();
        self.lock_session().cancel_all();
        self.cleanup_temp();
    }

    /// Remove the session temp directory. Missing is fine.
    fn cleanup_temp(&self) {
        let dir = self
            .temp_dir
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let result = match dir {
            Some(dir) => dir.close(),
            None => fs::remove_dir_all(&self.temp_path),
        };
        match result {
            Ok(()) => tracing::trace!(temp = %self.temp_path.display(), "temp directory removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(temp = %self.temp_path.display(), "remove temp directory: {e}")
            }
        }
    }

    /// Publish the terminal status. Only the first call has any effect;
    /// returns whether this call was it.
    fn finish(&self, status: DownloadStatus) -> bool {
        self.finish_with_progress(status, None)
    }

    /// Like `finish`, but first reports `final_bytes` as the last progress
    /// update so listeners see the full size before the terminal status.
    fn finish_with_progress(&self, status: DownloadStatus, final_bytes: Option<u64>) -> bool {
        if self.finish_claimed.swap(true, Ordering::AcqRel) {
            tracing::trace!(%status, "terminal status already published");
            return false;
        }
        self.set_phase(DownloadPhase::Finished);
        match &status {
            DownloadStatus::Successful => tracing::info!(url = %self.url, "{status}"),
            DownloadStatus::Cancelled => tracing::info!(url = %self.url, "{status}"),
            _ => tracing::warn!(url = %self.url, "{status}"),
        }
        if let Some(bytes) = final_bytes {
            self.listener.on_progress(bytes, self.file_size.load(Ordering::Acquire));
        }
        self.listener.on_finished(status.is_success(), &status);
        self.latch.publish(status);
        true
    }
}

impl PartObserver for Inner {
    fn started(&self, part: &Part) {
        let _ = self.lanes.started.send(part.clone());
    }

    fn got_response(&self, part: &Part, head: &ResponseHead) {
        let _ = self.lanes.response.send((part.clone(), head.status));
    }

    fn progress(&self, _part: &Part, chunk_len: u64, _expected: i64) {
        let _ = self.lanes.progress.send(chunk_len);
    }

    fn finished(&self, part: &Part, _success: bool, outcome: ConnectionOutcome) {
        let _ = self.lanes.finished.send((part.clone(), outcome));
    }
}
