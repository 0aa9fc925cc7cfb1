//! Caller-facing download notifications.

use tokio::sync::mpsc;

use super::{DownloadPhase, DownloadStatus};
use crate::transport::ResponseHead;

/// Receives download notifications. Every method defaults to a no-op.
///
/// Calls arrive on the manager's internal threads; implementations must not block
/// for long. `on_finished` is called exactly once per download.
pub trait DownloadListener: Send + Sync {
    fn on_started(&self, _phase: DownloadPhase) {}
    fn on_got_file_info(&self, _head: &ResponseHead) {}
    /// `total` is the size learned from the probe, `-1` or `0` when unknown.
    fn on_progress(&self, _downloaded: u64, _total: i64) {}
    fn on_finished(&self, _success: bool, _status: &DownloadStatus) {}
}

impl DownloadListener for () {}

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Started(DownloadPhase),
    GotFileInfo(ResponseHead),
    Progress { downloaded: u64, total: i64 },
    Finished { success: bool, status: DownloadStatus },
}

/// Forwards notifications into a tokio channel, for async callers.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<DownloadEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: DownloadEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl DownloadListener for ChannelListener {
    fn on_started(&self, phase: DownloadPhase) {
        self.send(DownloadEvent::Started(phase));
    }

    fn on_got_file_info(&self, head: &ResponseHead) {
        self.send(DownloadEvent::GotFileInfo(head.clone()));
    }

    fn on_progress(&self, downloaded: u64, total: i64) {
        self.send(DownloadEvent::Progress { downloaded, total });
    }

    fn on_finished(&self, success: bool, status: &DownloadStatus) {
        self.send(DownloadEvent::Finished {
            success,
            status: status.clone(),
        });
    }
}
