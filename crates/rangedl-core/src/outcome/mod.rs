//! Normalized connection outcomes.
//!
//! Every decision the manager takes about a finished request (advance, retry,
//! abort) is made on a `ConnectionOutcome`, never on raw status codes or
//! transport errors.

mod classify;

pub use classify::{classify, classify_http_status};

use std::fmt;

/// Result of one request after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionOutcome {
    Success,
    /// HTTP 401.
    Unauthenticated,
    /// The network is unreachable; retrying any part is pointless.
    NoConnectivity,
    Failure,
    TimedOut,
    Cancelled,
    /// HTTP 426.
    UpgradeRequired,
}

impl ConnectionOutcome {
    pub fn is_success(self) -> bool {
        self == ConnectionOutcome::Success
    }

    pub fn description(self) -> &'static str {
        match self {
            ConnectionOutcome::Success => "connection was successful",
            ConnectionOutcome::Unauthenticated => "the user is not authenticated",
            ConnectionOutcome::NoConnectivity => "there is no network connection",
            ConnectionOutcome::Failure => "connection was unsuccessful",
            ConnectionOutcome::TimedOut => "the connection timed out",
            ConnectionOutcome::Cancelled => "connection cancelled",
            ConnectionOutcome::UpgradeRequired => "upgrade required",
        }
    }
}

impl fmt::Display for ConnectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
