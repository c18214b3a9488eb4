//! `parfetch probe` – show what a HEAD request reports for a URL.

use anyhow::{Context, Result};
use parfetch_core::config::FetchConfig;
use parfetch_core::probe::{self, ProbeOptions};
use std::collections::HashMap;

pub async fn run_probe(url: &str, cfg: &FetchConfig) -> Result<()> {
    let opts = ProbeOptions {
        connect_timeout: cfg.connect_timeout(),
        ..ProbeOptions::default()
    };
    let owned = url.to_string();
    let info = tokio::task::spawn_blocking(move || probe::probe(&owned, &HashMap::new(), opts))
        .await?
        .with_context(|| format!("probe {}", url))?;

    println!("url:            {}", url);
    println!("size:           {} bytes", info.size);
    println!("etag:           {}", info.fingerprint.as_deref().unwrap_or("-"));
    println!("last-modified:  {}", info.last_modified.as_deref().unwrap_or("-"));
    println!("accept-ranges:  {}", if info.accept_ranges { "bytes" } else { "no" });
    Ok(())
}
