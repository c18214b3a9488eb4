//! HTTP HEAD / metadata probing.
//!
//! Learns the resource size (`Content-Length`) and fingerprint (`ETag`)
//! before any body bytes are transferred.

mod parse;

use std::collections::HashMap;
use std::str;
use std::time::Duration;

pub use parse::parse_headers;

/// Metadata learned from a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    /// Total size in bytes from `Content-Length`.
    pub size: u64,
    /// `ETag` with surrounding quotes stripped, if present.
    pub fingerprint: Option<String>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `Last-Modified` value if present.
    pub last_modified: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HEAD request failed: {0}")]
    Transport(#[from] curl::Error),
    #[error("HEAD {url} returned HTTP {code}")]
    Status { url: String, code: u32 },
    #[error("server did not send a numeric Content-Length")]
    MissingContentLength,
    #[error("ETag mismatch: expected {expected}, got {}", actual.as_deref().unwrap_or("<none>"))]
    FingerprintMismatch {
        expected: String,
        actual: Option<String>,
    },
}

/// Timeouts for the HEAD request.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Performs a HEAD request and returns the resource metadata.
///
/// Follows redirects; only the final response's headers are used. Blocking:
/// call from `spawn_blocking` if used from async code.
pub fn probe(
    url: &str,
    custom_headers: &HashMap<String, String>,
    opts: ProbeOptions,
) -> Result<ResourceInfo, ProbeError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.timeout)?;

    if !custom_headers.is_empty() {
        let mut list = curl::easy::List::new();
        for (k, v) in custom_headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let line = s.trim_end();
                // A new status line starts a new response (redirect hop).
                if line.starts_with("HTTP/") {
                    headers.clear();
                }
                headers.push(line.to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(ProbeError::Status {
            url: url.to_string(),
            code,
        });
    }

    let info = parse_headers(&headers)?;
    tracing::debug!(
        size = info.size,
        etag = info.fingerprint.as_deref().unwrap_or(""),
        accept_ranges = info.accept_ranges,
        "probed {}",
        url
    );
    Ok(info)
}

/// Compare the probed fingerprint against an expected ETag (quotes ignored).
pub fn check_fingerprint(info: &ResourceInfo, expected: &str) -> Result<(), ProbeError> {
    let expected = expected.trim().trim_matches('"');
    match info.fingerprint.as_deref() {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(ProbeError::FingerprintMismatch {
            expected: expected.to_string(),
            actual: actual.map(str::to_string),
        }),
    }
}
