pub mod config;
pub mod logging;

pub mod control;
pub mod manager;
pub mod outcome;
pub mod part;
pub mod progress;
pub mod segmenter;
pub mod transport;

pub use manager::{
    probe, ChannelListener, DownloadEvent, DownloadListener, DownloadManager, DownloadPhase,
    DownloadStatus, ManagerBuilder, ManagerError, ProbeReport,
};
pub use outcome::ConnectionOutcome;
