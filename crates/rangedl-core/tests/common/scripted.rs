//! In-process transport that serves a body and misbehaves on request.
//!
//! Each ranged GET is keyed by its start offset; a script of `Step`s per offset
//! decides what the next attempt for that range does. Unscripted attempts are
//! served normally.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rangedl_core::control::CancelToken;
use rangedl_core::transport::{
    Method, ResponseHandler, ResponseHead, Transport, TransportError, TransportErrorKind,
    TransportRequest,
};

pub const URL: &str = "http://scripted.test/file.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Serve,
    /// Respond with this status and no body.
    Status(u32),
    Offline,
    TimedOut,
    /// Hang until cancelled.
    Stall,
    /// Panic inside the transport.
    Panic,
}

pub struct ScriptedTransport {
    body: Vec<u8>,
    probe_status: Option<u32>,
    probe_panics: bool,
    delay: Duration,
    script: Mutex<HashMap<u64, VecDeque<Step>>>,
    requests: Mutex<Vec<(Method, Option<u64>)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    served: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            probe_status: None,
            probe_panics: false,
            delay: Duration::ZERO,
            script: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            served: AtomicUsize::new(0),
        }
    }

    /// Answer the probe with this status instead of 206.
    pub fn probe_status(mut self, status: u32) -> Self {
        self.probe_status = Some(status);
        self
    }

    /// Panic while answering the probe.
    pub fn panic_on_probe(mut self) -> Self {
        self.probe_panics = true;
        self
    }

    /// Hold every GET this long before answering.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue steps for the range starting at `from`.
    pub fn script(self, from: u64, steps: &[Step]) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(from)
            .or_default()
            .extend(steps.iter().copied());
        self
    }

    pub fn gets(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == Method::Get)
            .count()
    }

    pub fn gets_for(&self, from: u64) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, f)| *m == Method::Get && *f == Some(from))
            .count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// GETs answered with a complete body.
    pub fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    fn next_step(&self, from: u64) -> Step {
        self.script
            .lock()
            .unwrap()
            .get_mut(&from)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Serve)
    }

    fn total(&self) -> u64 {
        self.body.len() as u64
    }

    fn partial_head(&self, from: u64, to: u64) -> ResponseHead {
        ResponseHead::new(206)
            .with_header("Content-Range", format!("bytes {from}-{to}/{}", self.total()))
            .with_header("Content-Length", (to - from + 1).to_string())
    }

    fn sleep_unless_cancelled(&self, total: Duration, cancel: &CancelToken) -> bool {
        let mut left = total;
        while !left.is_zero() {
            if cancel.is_cancelled() {
                return false;
            }
            let step = left.min(Duration::from_millis(2));
            thread::sleep(step);
            left -= step;
        }
        !cancel.is_cancelled()
    }

    fn get(
        &self,
        request: &TransportRequest,
        handler: &mut dyn ResponseHandler,
        cancel: &CancelToken,
    ) -> Result<(), TransportError> {
        let cancelled = || TransportError::new(TransportErrorKind::Cancelled, "cancelled");
        if !self.sleep_unless_cancelled(self.delay, cancel) {
            return Err(cancelled());
        }
        let (from, to) = match request.range {
            Some(r) => (r.from(), r.to().min(self.total() - 1)),
            None => (0, self.total() - 1),
        };
        match self.next_step(from) {
            Step::Status(code) => {
                handler.on_head(ResponseHead::new(code));
                Ok(())
            }
            Step::Offline => Err(TransportError::new(TransportErrorKind::Offline, "offline")),
            Step::TimedOut => Err(TransportError::new(TransportErrorKind::TimedOut, "timed out")),
            Step::Panic => panic!("scripted transport panic at offset {from}"),
            Step::Stall => {
                while !cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(2));
                }
                Err(cancelled())
            }
            Step::Serve => {
                let head = if request.range.is_some() {
                    self.partial_head(from, to)
                } else {
                    ResponseHead::new(200).with_header("Content-Length", self.total().to_string())
                };
                handler.on_head(head);
                for chunk in self.body[from as usize..=to as usize].chunks(1024) {
                    if cancel.is_cancelled() {
                        return Err(cancelled());
                    }
                    if !handler.on_chunk(chunk) {
                        return Err(TransportError::new(TransportErrorKind::Other, "write aborted"));
                    }
                }
                self.served.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

impl Transport for ScriptedTransport {
    fn execute(
        &self,
        request: &TransportRequest,
        handler: &mut dyn ResponseHandler,
        cancel: &CancelToken,
    ) -> Result<(), TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.method, request.range.map(|r| r.from())));

        if request.method == Method::Head {
            if self.probe_panics {
                panic!("scripted transport panic during probe");
            }
            let head = match self.probe_status {
                Some(code) => ResponseHead::new(code),
                None => {
                    let to = request
                        .range
                        .map_or(self.total() - 1, |r| r.to().min(self.total() - 1));
                    self.partial_head(0, to)
                }
            };
            handler.on_head(head);
            return Ok(());
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.get(request, handler, cancel);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
