//! Construction of a `DownloadManager`.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::lanes;
use super::pool::WorkerPool;
use super::{DownloadListener, DownloadManager, DownloadPhase, FinishLatch, Inner, Session};
use crate::config::RangedlConfig;
use crate::part::RunSettings;
use crate::transport::{CurlTransport, Transport};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("connection count must be at least 1")]
    NoConnections,
    #[error("create temp directory: {0}")]
    TempDir(#[source] io::Error),
    #[error("spawn worker thread: {0}")]
    Thread(#[source] io::Error),
}

/// Builder for [`DownloadManager`]. Unset values come from the config.
pub struct ManagerBuilder {
    url: String,
    destination: PathBuf,
    tag: Option<String>,
    connection_count: Option<usize>,
    retry_count: Option<u32>,
    config: RangedlConfig,
    transport: Option<Arc<dyn Transport>>,
    listener: Option<Arc<dyn DownloadListener>>,
    temp_root: Option<PathBuf>,
}

impl ManagerBuilder {
    pub(super) fn new(url: String, destination: PathBuf) -> Self {
        Self {
            url,
            destination,
            tag: None,
            connection_count: None,
            retry_count: None,
            config: RangedlConfig::default(),
            transport: None,
            listener: None,
            temp_root: None,
        }
    }

    /// Opaque caller value kept with the manager.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn connection_count(mut self, n: usize) -> Self {
        self.connection_count = Some(n);
        self
    }

    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = Some(n);
        self
    }

    pub fn config(mut self, config: RangedlConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`CurlTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn DownloadListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Directory in which the session's temp directory is created.
    /// Defaults to the system temp dir.
    pub fn temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn build(self) -> Result<DownloadManager, ManagerError> {
        if let Err(source) = url::Url::parse(&self.url) {
            return Err(ManagerError::InvalidUrl {
                url: self.url,
                source,
            });
        }
        let connection_count = self
            .connection_count
            .unwrap_or(self.config.connection_count);
        if connection_count == 0 {
            return Err(ManagerError::NoConnections);
        }
        let retry_count = self.retry_count.unwrap_or(self.config.retry_count);

        let mut temp = tempfile::Builder::new();
        temp.prefix("rangedl-");
        let temp_dir = match &self.temp_root {
            Some(root) => temp.tempdir_in(root),
            None => temp.tempdir(),
        }
        .map_err(ManagerError::TempDir)?;
        let temp_path = temp_dir.path().to_path_buf();

        let pool = WorkerPool::new("rangedl-part", connection_count).map_err(ManagerError::Thread)?;
        let (lanes, receivers) = lanes::channels();
        let settings = RunSettings {
            options: self.config.transport_options(),
            flush_threshold: self.config.flush_threshold,
        };

        tracing::debug!(
            url = %self.url,
            dest = %self.destination.display(),
            temp = %temp_path.display(),
            workers = pool.size(),
            retry_count,
            "download manager created"
        );

        let inner = Arc::new(Inner {
            url: self.url,
            destination: self.destination,
            tag: self.tag,
            connection_count,
            retry_count,
            config: self.config,
            settings,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(CurlTransport::new())),
            listener: self.listener.unwrap_or_else(|| Arc::new(())),
            temp_dir: Mutex::new(Some(temp_dir)),
            temp_path,
            session: Mutex::new(Session::default()),
            started: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            finish_claimed: AtomicBool::new(false),
            latch: FinishLatch::default(),
            file_size: AtomicI64::new(-1),
            total_read: AtomicI64::new(0),
            phase: Mutex::new(DownloadPhase::NotStarted),
            pool,
            lanes,
        });
        receivers
            .spawn(Arc::downgrade(&inner))
            .map_err(ManagerError::Thread)?;
        Ok(DownloadManager { inner })
    }
}
