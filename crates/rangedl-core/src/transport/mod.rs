//! HTTP transport abstraction.
//!
//! Parts never talk to libcurl directly; they hand a `TransportRequest` and a
//! `ResponseHandler` to a `Transport`. The production implementation is
//! `CurlTransport`; tests substitute scripted transports.

mod curl;
mod error;
mod head;

pub use self::curl::CurlTransport;
pub use error::{TransportError, TransportErrorKind};
pub use head::{parse_response_head, ResponseHead};

use std::time::Duration;

use crate::control::CancelToken;
use crate::segmenter::ByteRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

/// Timeouts and redirect policy applied to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub max_redirections: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            max_redirections: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub method: Method,
    /// Sent as `Range: bytes=from-to` when present.
    pub range: Option<ByteRange>,
    pub options: TransportOptions,
}

/// Receives the response of one request.
///
/// `on_head` is called at most once, before any body chunk. Returning `false`
/// from `on_chunk` aborts the transfer.
pub trait ResponseHandler {
    fn on_head(&mut self, head: ResponseHead);
    fn on_chunk(&mut self, chunk: &[u8]) -> bool;
}

/// Executes one HTTP request to completion on the calling thread.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &TransportRequest,
        handler: &mut dyn ResponseHandler,
        cancel: &CancelToken,
    ) -> Result<(), TransportError>;
}
