//! `rangedl get` – download one URL with parallel range requests.

use anyhow::{bail, Result};
use rangedl_core::config::RangedlConfig;
use rangedl_core::progress::ProgressStats;
use rangedl_core::{ChannelListener, DownloadEvent, DownloadManager, DownloadStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const FALLBACK_NAME: &str = "download.bin";

#[derive(Debug)]
pub struct GetArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub connections: Option<usize>,
    pub retries: Option<u32>,
}

pub async fn run_get(cfg: &RangedlConfig, args: GetArgs) -> Result<()> {
    let output = match args.output {
        Some(path) => path,
        None => std::env::current_dir()?.join(default_output_name(&args.url)),
    };

    let (listener, mut events) = ChannelListener::new();
    let mut builder = DownloadManager::builder(&args.url, &output)
        .config(cfg.clone())
        .listener(Arc::new(listener));
    if let Some(n) = args.connections {
        builder = builder.connection_count(n);
    }
    if let Some(n) = args.retries {
        builder = builder.retry_count(n);
    }
    let manager = builder.build()?;

    tracing::info!(url = %args.url, output = %output.display(), "starting download");
    println!("{} -> {}", args.url, output.display());
    manager.start();

    let started = Instant::now();
    let mut last_print: Option<Instant> = None;
    let status = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(DownloadEvent::Progress { downloaded, total }) => {
                    let stats = ProgressStats::new(downloaded, total, started.elapsed());
                    let due = last_print.map_or(true, |t| t.elapsed() >= PROGRESS_INTERVAL);
                    if due || stats.is_complete() {
                        print_progress(&stats);
                        last_print = Some(Instant::now());
                    }
                }
                Some(DownloadEvent::GotFileInfo(head)) => {
                    tracing::debug!(status = head.status, "got file information");
                }
                Some(DownloadEvent::Started(phase)) => tracing::debug!(?phase, "phase"),
                Some(DownloadEvent::Finished { status, .. }) => break status,
                None => bail!("download ended without a result"),
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                manager.cancel(true);
            }
        }
    };
    println!();

    match status {
        DownloadStatus::Successful => {
            println!("saved {}", output.display());
            Ok(())
        }
        other => bail!("{}", other),
    }
}

fn print_progress(stats: &ProgressStats) {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let rate_mib = stats.bytes_per_sec() / 1_048_576.0;
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    match (stats.total_bytes, stats.fraction()) {
        (Some(total), Some(fraction)) => print!(
            "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}  ",
            done_mib,
            total as f64 / 1_048_576.0,
            fraction * 100.0,
            rate_mib,
            eta
        ),
        _ => print!("\r  {:.1} MiB  {:.2} MiB/s  ", done_mib, rate_mib),
    }
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

/// File name for a URL: its last path segment made safe for the local
/// filesystem, or `download.bin` when there is none.
pub fn default_output_name(url: &str) -> String {
    let segment = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_default();

    let mut name = String::with_capacity(segment.len());
    for c in segment.chars() {
        let safe = if c.is_control() || c.is_whitespace() || c == '\\' { '_' } else { c };
        if !(safe == '_' && name.ends_with('_')) {
            name.push(safe);
        }
    }
    let name = name.trim_matches(|c| c == '.' || c == '_');
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name.chars().take(255).collect()
    }
}
