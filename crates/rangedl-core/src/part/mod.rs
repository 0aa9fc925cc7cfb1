//! A single request (whole resource or one byte range) streamed to a private temp file.
//!
//! `Part` is a cheap, cloneable handle: the manager keeps it in its part list
//! while a pool worker runs it, and `cancel` may be called from any thread.

mod error;
mod sizes;
mod writer;

pub use error::PartError;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::control::CancelToken;
use crate::outcome::{classify, classify_http_status, ConnectionOutcome};
use crate::segmenter::ByteRange;
use crate::transport::{
    Method, ResponseHandler, ResponseHead, Transport, TransportError, TransportOptions,
    TransportRequest,
};
use sizes::{learn_sizes, LearnedSizes};
use writer::PartWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartStatus {
    #[default]
    WaitingToStart,
    InProgress,
    Completed,
    Errored(ConnectionOutcome),
}

/// Settings shared by every part of a download.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub options: TransportOptions,
    /// Buffered bytes before a write to the temp file.
    pub flush_threshold: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            options: TransportOptions::default(),
            flush_threshold: 3 * 1024,
        }
    }
}

/// Lifecycle callbacks of a running part. All methods default to no-ops.
pub trait PartObserver: Send + Sync {
    fn started(&self, _part: &Part) {}
    fn got_response(&self, _part: &Part, _head: &ResponseHead) {}
    /// `expected` is the part's size from `Content-Length`, `-1` if unknown.
    fn progress(&self, _part: &Part, _chunk_len: u64, _expected: i64) {}
    fn finished(&self, _part: &Part, _success: bool, _outcome: ConnectionOutcome) {}
}

impl PartObserver for () {}

#[derive(Debug)]
struct PartState {
    status: PartStatus,
    downloaded: u64,
    whole_file_size: i64,
    range_size: i64,
    response: Option<ResponseHead>,
    error: Option<PartError>,
}

impl Default for PartState {
    fn default() -> Self {
        Self {
            status: PartStatus::WaitingToStart,
            downloaded: 0,
            whole_file_size: -1,
            range_size: -1,
            response: None,
            error: None,
        }
    }
}

#[derive(Debug)]
struct PartInner {
    name: String,
    url: String,
    file: Option<PathBuf>,
    range: Option<ByteRange>,
    method: Method,
    cancel: CancelToken,
    state: Mutex<PartState>,
}

#[derive(Debug, Clone)]
pub struct Part {
    inner: Arc<PartInner>,
}

impl Part {
    /// A GET for `range` (or the whole resource) written to `file`.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        file: impl Into<PathBuf>,
        range: Option<ByteRange>,
    ) -> Self {
        Self::build(name.into(), url.into(), Some(file.into()), range, Method::Get)
    }

    /// Header-only HEAD request with range `0-upper_bound`, used to learn the
    /// file size and whether the server answers ranges with 206.
    pub fn probe(url: impl Into<String>, upper_bound: u64) -> Self {
        Self::build(
            "probe".to_string(),
            url.into(),
            None,
            ByteRange::new(0, upper_bound),
            Method::Head,
        )
    }

    fn build(
        name: String,
        url: String,
        file: Option<PathBuf>,
        range: Option<ByteRange>,
        method: Method,
    ) -> Self {
        Self {
            inner: Arc::new(PartInner {
                name,
                url,
                file,
                range,
                method,
                cancel: CancelToken::new(),
                state: Mutex::new(PartState::default()),
            }),
        }
    }

    /// Fresh part with the same name, file and range, for a retry.
    pub fn renewed(&self) -> Self {
        let inner = &self.inner;
        Self::build(
            inner.name.clone(),
            inner.url.clone(),
            inner.file.clone(),
            inner.range,
            inner.method,
        )
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn file(&self) -> Option<&Path> {
        self.inner.file.as_deref()
    }

    pub fn range(&self) -> Option<ByteRange> {
        self.inner.range
    }

    pub fn method(&self) -> Method {
        self.inner.method
    }

    pub fn status(&self) -> PartStatus {
        self.state().status
    }

    pub fn downloaded(&self) -> u64 {
        self.state().downloaded
    }

    /// Whole-file size learned from the response, `-1` if unknown.
    pub fn whole_file_size(&self) -> i64 {
        self.state().whole_file_size
    }

    /// This response's body size from `Content-Length`, `-1` if unknown.
    pub fn range_size(&self) -> i64 {
        self.state().range_size
    }

    pub fn response(&self) -> Option<ResponseHead> {
        self.state().response.clone()
    }

    pub fn error(&self) -> Option<PartError> {
        self.state().error.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// True when both handles refer to the same part instance.
    pub fn same_as(&self, other: &Part) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_status(&self, status: PartStatus) {
        self.state().status = status;
    }

    fn state(&self) -> MutexGuard<'_, PartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Abort the request and delete the temp file. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancel.cancel() {
            tracing::debug!(part = %self.name(), "part cancelled");
            self.remove_file();
        }
    }

    /// Delete the temp file if there is one. A missing file is not an error.
    pub fn remove_file(&self) {
        if let Some(path) = self.file() {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        part = %self.name(),
                        path = %path.display(),
                        "remove temp file: {e}"
                    )
                }
            }
        }
    }

    /// Execute the request on the calling thread and return its outcome.
    ///
    /// A part that was cancelled before starting returns `Cancelled` without
    /// touching the network or calling the observer.
    pub fn run(
        &self,
        transport: &dyn Transport,
        settings: &RunSettings,
        observer: &dyn PartObserver,
    ) -> ConnectionOutcome {
        if self.is_cancelled() {
            tracing::debug!(part = %self.name(), "not starting cancelled part");
            return ConnectionOutcome::Cancelled;
        }
        self.set_status(PartStatus::InProgress);
        observer.started(self);

        let request = TransportRequest {
            url: self.inner.url.clone(),
            method: self.inner.method,
            range: self.inner.range,
            options: settings.options.clone(),
        };
        tracing::debug!(
            part = %self.name(),
            method = ?request.method,
            range = ?request.range.map(|r| r.header_value()),
            "part started"
        );

        let mut sink = PartSink {
            part: self,
            observer,
            flush_threshold: settings.flush_threshold,
            status: None,
            writer: None,
            storage_error: None,
            range_ignored: None,
            received: 0,
        };
        let result = transport.execute(&request, &mut sink, &self.inner.cancel);
        let (outcome, error) = sink.finish(result);

        {
            let mut state = self.state();
            state.status = if outcome.is_success() {
                PartStatus::Completed
            } else {
                PartStatus::Errored(outcome)
            };
            state.error = error;
        }
        if outcome == ConnectionOutcome::Cancelled || self.is_cancelled() {
            self.remove_file();
        }
        match outcome {
            ConnectionOutcome::Success => {
                tracing::debug!(part = %self.name(), bytes = self.downloaded(), "part completed")
            }
            ConnectionOutcome::Cancelled => tracing::debug!(part = %self.name(), "part cancelled"),
            other => {
                tracing::warn!(part = %self.name(), error = ?self.error(), "part failed: {other}")
            }
        }
        observer.finished(self, outcome.is_success(), outcome);
        outcome
    }
}

/// Receives one response on behalf of a part.
struct PartSink<'a> {
    part: &'a Part,
    observer: &'a dyn PartObserver,
    flush_threshold: usize,
    status: Option<u32>,
    writer: Option<PartWriter>,
    storage_error: Option<io::Error>,
    range_ignored: Option<u32>,
    received: u64,
}

impl PartSink<'_> {
    fn is_ranged_get(&self) -> bool {
        self.part.inner.method == Method::Get && self.part.inner.range.is_some()
    }

    /// Close the temp file and pick the final outcome.
    ///
    /// Cancellation wins over everything; then local storage failures; then a
    /// server that answered a ranged GET with the whole body; then transport
    /// errors; then the HTTP status, with a short ranged body counted as failure.
    fn finish(
        mut self,
        result: Result<(), TransportError>,
    ) -> (ConnectionOutcome, Option<PartError>) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finish() {
                self.storage_error.get_or_insert(e);
            }
        }

        if self.part.is_cancelled() {
            return (
                ConnectionOutcome::Cancelled,
                result.err().map(PartError::Transport),
            );
        }
        if let Some(e) = self.storage_error.take() {
            return (ConnectionOutcome::Failure, Some(PartError::from(e)));
        }
        if let Some(code) = self.range_ignored {
            return (ConnectionOutcome::Failure, Some(PartError::RangeIgnored(code)));
        }
        if let Err(e) = result {
            let outcome = match classify(self.status, Some(&e)) {
                ConnectionOutcome::Success => ConnectionOutcome::Failure,
                other => other,
            };
            return (outcome, Some(PartError::Transport(e)));
        }

        let outcome = classify(self.status, None);
        if outcome.is_success() && self.is_ranged_get() {
            if let Some(range) = self.part.inner.range {
                if self.received != range.len() {
                    return (
                        ConnectionOutcome::Failure,
                        Some(PartError::ShortTransfer {
                            expected: range.len(),
                            received: self.received,
                        }),
                    );
                }
            }
        }
        (outcome, None)
    }
}

impl ResponseHandler for PartSink<'_> {
    fn on_head(&mut self, head: ResponseHead) {
        let outcome = classify_http_status(head.status);
        self.status = Some(head.status);
        let sizes = if outcome.is_success() {
            learn_sizes(&head)
        } else {
            LearnedSizes::UNKNOWN
        };

        if outcome.is_success() && self.is_ranged_get() && head.status != 206 {
            self.range_ignored = Some(head.status);
        }
        if outcome.is_success() && self.range_ignored.is_none() && !self.part.is_cancelled() {
            if let Some(path) = self.part.file() {
                match PartWriter::create(path, self.flush_threshold) {
                    Ok(writer) => self.writer = Some(writer),
                    Err(e) => self.storage_error = Some(e),
                }
            }
        }

        {
            let mut state = self.part.state();
            state.whole_file_size = sizes.whole_file;
            state.range_size = sizes.range;
            state.response = Some(head.clone());
        }
        self.observer.got_response(self.part, &head);
    }

    fn on_chunk(&mut self, chunk: &[u8]) -> bool {
        if self.part.is_cancelled() || self.storage_error.is_some() || self.range_ignored.is_some()
        {
            return false;
        }
        // Error bodies of non-success responses are drained and dropped.
        let Some(writer) = self.writer.as_mut() else {
            return true;
        };
        if let Err(e) = writer.push(chunk) {
            self.storage_error = Some(e);
            return false;
        }
        let len = chunk.len() as u64;
        self.received += len;
        let expected = {
            let mut state = self.part.state();
            state.downloaded += len;
            state.range_size
        };
        self.observer.progress(self.part, len, expected);
        true
    }
}
