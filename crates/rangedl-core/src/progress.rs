//! Progress snapshots for display (bytes done, rate, ETA).
//!
//! Built from the `(downloaded, total)` pairs a `DownloadListener` receives.

use std::time::Duration;

/// Snapshot of one download's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    pub bytes_done: u64,
    /// Whole-file size, `None` when the server did not report one.
    pub total_bytes: Option<u64>,
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// `total` follows the listener convention: `<= 0` means unknown.
    pub fn new(bytes_done: u64, total: i64, elapsed: Duration) -> Self {
        Self {
            bytes_done,
            total_bytes: u64::try_from(total).ok().filter(|t| *t > 0),
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    /// Average rate in bytes per second (0 if no time has passed).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining; `None` without a total or a rate.
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0], if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes?;
        Some((self.bytes_done as f64 / total as f64).min(1.0))
    }

    pub fn is_complete(&self) -> bool {
        self.total_bytes.is_some_and(|t| self.bytes_done >= t)
    }
}
