//! Parse HTTP response header lines into ResourceInfo.

use super::{ProbeError, ResourceInfo};

/// Parse collected header lines. Fails if `Content-Length` is absent or not a number.
pub fn parse_headers(lines: &[String]) -> Result<ResourceInfo, ProbeError> {
    let mut content_length = None;
    let mut accept_ranges = false;
    let mut etag = None;
    let mut last_modified = None;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse::<u64>().ok();
            } else if name.eq_ignore_ascii_case("accept-ranges") {
                accept_ranges = value.eq_ignore_ascii_case("bytes");
            } else if name.eq_ignore_ascii_case("etag") {
                etag = Some(value.trim_matches('"').to_string());
            } else if name.eq_ignore_ascii_case("last-modified") {
                last_modified = Some(value.to_string());
            }
        }
    }

    Ok(ResourceInfo {
        size: content_length.ok_or(ProbeError::MissingContentLength)?,
        fingerprint: etag,
        accept_ranges,
        last_modified,
    })
}
