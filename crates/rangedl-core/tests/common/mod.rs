#![allow(dead_code)]

pub mod range_server;
pub mod scripted;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use rangedl_core::config::RangedlConfig;
use rangedl_core::{DownloadListener, DownloadPhase, DownloadStatus};

/// Deterministic, non-repeating-looking test payload.
pub fn pattern_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Config with a small part size so tests stay fast.
pub fn config_with_part_size(part_size: u64) -> RangedlConfig {
    RangedlConfig {
        part_size,
        connect_timeout_secs: 5,
        ..RangedlConfig::default()
    }
}

/// Records everything a listener is told.
#[derive(Default)]
pub struct RecordingListener {
    pub phases: Mutex<Vec<DownloadPhase>>,
    pub file_infos: AtomicUsize,
    pub last_progress: Mutex<Option<(u64, i64)>>,
    pub finished: Mutex<Vec<(bool, DownloadStatus)>>,
}

impl RecordingListener {
    pub fn finished_count(&self) -> usize {
        self.finished.lock().unwrap().len()
    }

    pub fn phases(&self) -> Vec<DownloadPhase> {
        self.phases.lock().unwrap().clone()
    }
}

impl DownloadListener for RecordingListener {
    fn on_started(&self, phase: DownloadPhase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn on_got_file_info(&self, _head: &rangedl_core::transport::ResponseHead) {
        self.file_infos.fetch_add(1, Ordering::SeqCst);
    }

    fn on_progress(&self, downloaded: u64, total: i64) {
        *self.last_progress.lock().unwrap() = Some((downloaded, total));
    }

    fn on_finished(&self, success: bool, status: &DownloadStatus) {
        self.finished.lock().unwrap().push((success, status.clone()));
    }
}
