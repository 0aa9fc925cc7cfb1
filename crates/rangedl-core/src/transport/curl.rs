//! libcurl-backed transport: one `Easy` handle per request.

use std::cell::{Cell, RefCell};

use curl::easy::Easy;

use super::{
    parse_response_head, Method, ResponseHandler, Transport, TransportError, TransportErrorKind,
    TransportRequest,
};
use crate::control::CancelToken;

#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTransport;

impl CurlTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for CurlTransport {
    fn execute(
        &self,
        request: &TransportRequest,
        handler: &mut dyn ResponseHandler,
        cancel: &CancelToken,
    ) -> Result<(), TransportError> {
        let mut easy = Easy::new();
        configure(&mut easy, request).map_err(|e| classify_curl_error(&e, cancel))?;

        let header_lines: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let head_sent = Cell::new(false);

        let to_err = |e: curl::Error| classify_curl_error(&e, cancel);
        let perform_result = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|raw| {
                    let line = String::from_utf8_lossy(raw).trim_end().to_string();
                    let mut lines = header_lines.borrow_mut();
                    if line.starts_with("HTTP/") {
                        lines.clear();
                    }
                    lines.push(line);
                    true
                })
                .map_err(to_err)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(to_err)?;
            transfer
                .write_function(|data| {
                    if cancel.is_cancelled() {
                        return Ok(0);
                    }
                    if !head_sent.get() {
                        head_sent.set(true);
                        if let Some(head) = parse_response_head(&header_lines.borrow()) {
                            handler.on_head(head);
                        }
                    }
                    if handler.on_chunk(data) {
                        Ok(data.len())
                    } else {
                        Ok(0)
                    }
                })
                .map_err(to_err)?;
            transfer.perform()
        };

        // HEAD requests and empty bodies never reach the write callback.
        if !head_sent.get() {
            if let Some(head) = parse_response_head(&header_lines.borrow()) {
                handler.on_head(head);
            }
        }

        perform_result.map_err(to_err)
    }
}

fn configure(easy: &mut Easy, request: &TransportRequest) -> Result<(), curl::Error> {
    let opts = &request.options;
    easy.url(&request.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    // Abort only when throughput stays below the limit; large parts on slow links keep going.
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    easy.progress(true)?;
    if request.method == Method::Head {
        easy.nobody(true)?;
    }
    if let Some(range) = request.range {
        easy.range(&range.curl_range())?;
    }
    Ok(())
}

/// Map a curl error onto a transport error kind.
pub(crate) fn classify_curl_error(e: &curl::Error, cancel: &CancelToken) -> TransportError {
    let kind = if e.is_aborted_by_callback() {
        TransportErrorKind::Cancelled
    } else if e.is_operation_timedout() {
        TransportErrorKind::TimedOut
    } else if e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_couldnt_connect()
        || e.is_send_error()
        || e.is_recv_error()
        || e.is_too_many_redirects()
    {
        TransportErrorKind::Offline
    } else if e.is_write_error() && cancel.is_cancelled() {
        TransportErrorKind::Cancelled
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(code: i32, cancel: &CancelToken) -> TransportErrorKind {
        classify_curl_error(&curl::Error::new(code as _), cancel).kind()
    }

    #[test]
    fn resolve_and_connect_are_offline() {
        let token = CancelToken::new();
        assert_eq!(kind_of(6, &token), TransportErrorKind::Offline);
        assert_eq!(kind_of(7, &token), TransportErrorKind::Offline);
    }

    #[test]
    fn timeout_kind() {
        assert_eq!(kind_of(28, &CancelToken::new()), TransportErrorKind::TimedOut);
    }

    #[test]
    fn aborted_by_callback_is_cancelled() {
        assert_eq!(kind_of(42, &CancelToken::new()), TransportErrorKind::Cancelled);
    }

    #[test]
    fn write_error_depends_on_cancel_token() {
        let token = CancelToken::new();
        assert_eq!(kind_of(23, &token), TransportErrorKind::Other);
        token.cancel();
        assert_eq!(kind_of(23, &token), TransportErrorKind::Cancelled);
    }
}
