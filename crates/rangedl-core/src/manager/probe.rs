//! Header-only probe that learns size and range support before planning.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::plan::{build_plan, PlanInput};
use super::{DownloadPhase, DownloadStatus, Inner};
use crate::config::RangedlConfig;
use crate::outcome::ConnectionOutcome;
use crate::part::{Part, PartError, RunSettings};
use crate::transport::{ResponseHead, Transport};

/// What a probe learned about a URL.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub outcome: ConnectionOutcome,
    /// The server answered the ranged probe with 206.
    pub supports_ranges: bool,
    /// Whole-file size, `-1` when the probe failed.
    pub file_size: i64,
    pub response: Option<ResponseHead>,
    pub error: Option<PartError>,
}

impl ProbeReport {
    fn from_part(part: &Part, outcome: ConnectionOutcome) -> Self {
        let response = part.response();
        Self {
            outcome,
            supports_ranges: outcome.is_success()
                && response.as_ref().is_some_and(|r| r.status == 206),
            file_size: part.whole_file_size(),
            response,
            error: part.error(),
        }
    }
}

/// Probe `url` on the calling thread without downloading anything.
pub fn probe(transport: &dyn Transport, url: &str, config: &RangedlConfig) -> ProbeReport {
    let part = Part::probe(url, config.probe_upper_bound);
    let settings = RunSettings {
        options: config.transport_options(),
        flush_threshold: config.flush_threshold,
    };
    let outcome = part.run(transport, &settings, &());
    ProbeReport::from_part(&part, outcome)
}

impl Inner {
    /// Pool job for the probe. A panic ends the session with `ErrorOccurred`.
    pub(super) fn run_probe_guarded(self: &Arc<Self>, probe: Part) {
        let job_probe = probe.clone();
        if panic::catch_unwind(AssertUnwindSafe(|| self.run_probe(job_probe))).is_err() {
            tracing::error!(url = %self.url, "probe worker panicked");
            self.cleanup_temp();
            self.finish(DownloadStatus::ErrorOccurred {
                response: probe.response(),
                error: probe.error(),
            });
        }
    }

    /// Run the probe, then plan and start dispatching.
    fn run_probe(self: &Arc<Self>, probe: Part) {
        let outcome = probe.run(self.transport.as_ref(), &self.settings, &());
        if self.is_cancelled() {
            self.cleanup_temp();
            return;
        }
        let report = ProbeReport::from_part(&probe, outcome);
        if !outcome.is_success() {
            tracing::warn!(url = %self.url, "probe failed: {outcome}");
            self.cleanup_temp();
            self.finish(DownloadStatus::ErrorOccurred {
                response: report.response,
                error: report.error,
            });
            return;
        }

        tracing::info!(
            url = %self.url,
            size = report.file_size,
            ranges = report.supports_ranges,
            "got file information"
        );
        self.set_file_size(report.file_size);
        self.set_phase(DownloadPhase::GotFileInformation);
        if let Some(head) = &report.response {
            self.listener.on_got_file_info(head);
        }

        let plan = build_plan(&PlanInput {
            url: &self.url,
            temp_dir: &self.temp_path,
            supports_ranges: report.supports_ranges,
            file_size: report.file_size,
            part_size: self.config.part_size,
            min_part_size: self.config.min_part_size,
            connection_count: self.connection_count,
        });
        self.notify_phase(DownloadPhase::Downloading);
        let mut session = self.lock_session();
        if self.is_cancelled() {
            return;
        }
        tracing::debug!(parts = plan.len(), "range plan ready");
        session.parts = plan;
        self.dispatch_locked(&mut session);
    }
}
