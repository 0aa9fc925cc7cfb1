use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::transport::TransportOptions;

/// Global configuration loaded from `~/.config/rangedl/config.toml`.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangedlConfig {
    /// Parts downloaded at the same time (size of the worker pool).
    pub connection_count: usize,
    /// Retries shared by all parts of one download.
    pub retry_count: u32,
    /// Preferred size of one ranged part in bytes.
    pub part_size: u64,
    /// Below this, `part_size` is ignored and the file is split evenly across connections.
    pub min_part_size: u64,
    /// Buffered bytes a part holds before writing to its temp file.
    pub flush_threshold: usize,
    /// Upper bound of the synthetic range sent with the HEAD probe.
    pub probe_upper_bound: u64,
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    pub max_redirections: u32,
}

impl Default for RangedlConfig {
    fn default() -> Self {
        Self {
            connection_count: 4,
            retry_count: 3,
            part_size: 2 * 1024 * 1024,
            min_part_size: 512,
            flush_threshold: 3 * 1024,
            probe_upper_bound: 10_000_000,
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            max_redirections: 10,
        }
    }
}

impl RangedlConfig {
    /// Per-request transport settings derived from this config.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            max_redirections: self.max_redirections,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rangedl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RangedlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RangedlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RangedlConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
