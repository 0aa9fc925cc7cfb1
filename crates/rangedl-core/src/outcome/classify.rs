//! Classify HTTP status and transport errors into connection outcomes.

use super::ConnectionOutcome;
use crate::transport::{TransportError, TransportErrorKind};

/// Classify a request result.
///
/// Transport errors win over any status code that may have been seen before
/// the failure: offline first, then explicit cancellation, then timeouts.
/// Only then is the HTTP status mapped; no status at all means the request
/// never got a response and is reported as `Cancelled`.
pub fn classify(status: Option<u32>, error: Option<&TransportError>) -> ConnectionOutcome {
    if let Some(err) = error {
        match err.kind() {
            TransportErrorKind::Offline => return ConnectionOutcome::NoConnectivity,
            TransportErrorKind::Cancelled => return ConnectionOutcome::Cancelled,
            TransportErrorKind::TimedOut => return ConnectionOutcome::TimedOut,
            TransportErrorKind::Other => {}
        }
    }
    match status {
        Some(code) => classify_http_status(code),
        None => ConnectionOutcome::Cancelled,
    }
}

/// Map an HTTP status code on its own.
pub fn classify_http_status(code: u32) -> ConnectionOutcome {
    match code {
        200..=299 => ConnectionOutcome::Success,
        300..=399 => ConnectionOutcome::Failure,
        401 => ConnectionOutcome::Unauthenticated,
        426 => ConnectionOutcome::UpgradeRequired,
        504 => ConnectionOutcome::TimedOut,
        _ => ConnectionOutcome::Failure,
    }
}
