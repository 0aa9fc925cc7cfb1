//! Lifecycle phase, terminal status and the one-shot finish latch.

use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::part::PartError;
use crate::transport::ResponseHead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    #[default]
    NotStarted,
    Started,
    GettingInformation,
    GotFileInformation,
    Downloading,
    Finished,
}

/// Terminal result of a download, delivered exactly once.
#[derive(Debug, Clone)]
pub enum DownloadStatus {
    Successful,
    /// Parts were downloaded but the destination file could not be written.
    CouldNotMakeFile,
    Cancelled,
    /// Last response and error seen from the part (or probe) that ended the session.
    ErrorOccurred {
        response: Option<ResponseHead>,
        error: Option<PartError>,
    },
}

impl DownloadStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadStatus::Successful)
    }

    pub fn response(&self) -> Option<&ResponseHead> {
        match self {
            DownloadStatus::ErrorOccurred { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PartError> {
        match self {
            DownloadStatus::ErrorOccurred { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Successful => f.write_str("download successful"),
            DownloadStatus::CouldNotMakeFile => f.write_str("could not make the output file"),
            DownloadStatus::Cancelled => f.write_str("download cancelled"),
            DownloadStatus::ErrorOccurred { response, error } => {
                f.write_str("download failed")?;
                if let Some(head) = response {
                    write!(f, " (HTTP {})", head.status)?;
                }
                if let Some(err) = error {
                    write!(f, ": {err}")?;
                }
                Ok(())
            }
        }
    }
}

/// Holds the terminal status once published and wakes waiters.
#[derive(Debug, Default)]
pub(super) struct FinishLatch {
    status: Mutex<Option<DownloadStatus>>,
    cond: Condvar,
}

impl FinishLatch {
    pub(super) fn publish(&self, status: DownloadStatus) {
        let mut slot = self.status.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(status);
            self.cond.notify_all();
        }
    }

    pub(super) fn get(&self) -> Option<DownloadStatus> {
        self.status
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub(super) fn wait(&self) -> DownloadStatus {
        let mut slot = self.status.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if let Some(status) = slot.as_ref() {
                return status.clone();
            }
            slot = self.cond.wait(slot).unwrap_or_else(|p| p.into_inner());
        }
    }

    pub(super) fn wait_timeout(&self, timeout: Duration) -> Option<DownloadStatus> {
        let slot = self.status.lock().unwrap_or_else(|p| p.into_inner());
        let (slot, _) = self
            .cond
            .wait_timeout_while(slot, timeout, |s| s.is_none())
            .unwrap_or_else(|p| p.into_inner());
        slot.clone()
    }
}
