use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::transport::TransportError;

/// Why a part did not complete, kept alongside its classified outcome.
#[derive(Debug, Clone, Error)]
pub enum PartError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("temp file error: {0}")]
    Storage(Arc<io::Error>),
    #[error("server ignored the range request (status {0})")]
    RangeIgnored(u32),
    #[error("short transfer: expected {expected} bytes, received {received}")]
    ShortTransfer { expected: u64, received: u64 },
}

impl From<io::Error> for PartError {
    fn from(e: io::Error) -> Self {
        PartError::Storage(Arc::new(e))
    }
}
