//! `rangedl probe` – print what the server reports about a URL.

use anyhow::{bail, Result};
use rangedl_core::config::RangedlConfig;
use rangedl_core::probe;
use rangedl_core::transport::CurlTransport;

pub async fn run_probe(cfg: &RangedlConfig, url: &str) -> Result<()> {
    let url = url.to_string();
    let cfg = cfg.clone();
    let report =
        tokio::task::spawn_blocking(move || probe(&CurlTransport::new(), &url, &cfg)).await?;

    if !report.outcome.is_success() {
        match (&report.response, &report.error) {
            (_, Some(err)) => bail!("probe failed: {} ({})", report.outcome, err),
            (Some(head), None) => bail!("probe failed: {} (HTTP {})", report.outcome, head.status),
            (None, None) => bail!("probe failed: {}", report.outcome),
        }
    }

    let size = if report.file_size > 0 {
        format!("{} bytes", report.file_size)
    } else {
        "unknown".to_string()
    };
    println!("size:           {size}");
    println!(
        "range requests: {}",
        if report.supports_ranges { "supported" } else { "not supported" }
    );
    if let Some(head) = &report.response {
        println!("status:         {}", head.status);
    }
    Ok(())
}
