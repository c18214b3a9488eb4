//! Single-stream HTTP GET downloader (sequential mode).
//!
//! Writes the response body sequentially to storage starting at offset 0.

use anyhow::{Context, Result};
use std::cell::Cell;
use std::collections::HashMap;
use std::str;

use super::CurlOptions;
use crate::control::Cancel;
use crate::storage::StorageWriter;

/// Downloads a URL with a single GET (no Range), writing sequentially to `storage`.
/// Expects `200 OK`; when `expected_len` is known the body must match it exactly.
/// Returns the number of bytes written.
pub fn download_single(
    url: &str,
    custom_headers: &HashMap<String, String>,
    storage: &StorageWriter,
    expected_len: Option<u64>,
    curl: CurlOptions,
    cancel: &dyn Cancel,
) -> Result<u64> {
    let offset = Cell::new(0u64);
    let write_failed = Cell::new(false);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(curl.connect_timeout)?;
    easy.low_speed_limit(curl.low_speed_limit)?;
    easy.low_speed_time(curl.low_speed_time)?;
    easy.progress(true)?;

    if !custom_headers.is_empty() {
        let mut list = curl::easy::List::new();
        for (k, v) in custom_headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
    }

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            let off = offset.get();
            match storage.write_at(off, data) {
                Ok(()) => {
                    offset.set(off + data.len() as u64);
                    Ok(data.len())
                }
                Err(e) => {
                    tracing::warn!("sequential download write failed: {}", e);
                    write_failed.set(true);
                    Ok(0) // abort transfer
                }
            }
        })?;
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if cancel.is_cancelled() {
            return Err(crate::control::Cancelled.into());
        }
        if write_failed.get() {
            anyhow::bail!("could not write to {}", storage.path().display());
        }
        return Err(e).context("GET request failed");
    }

    let code = easy.response_code().context("no response code")?;
    if code != 200 {
        anyhow::bail!("wrong status received: expected 200, got {}", code);
    }

    let written = offset.get();
    if let Some(exp) = expected_len {
        if written != exp {
            anyhow::bail!("partial transfer: wrote {} of {} bytes", written, exp);
        }
    }
    Ok(written)
}
