//! Response header checks shared by the range and sequential fetchers.

use crate::retry::FetchError;
use crate::segmenter::ByteRange;

/// Status code from the last `HTTP/x y ...` line (redirect hops reset the list).
pub(crate) fn parse_http_status(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("HTTP/"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
}

/// Raw `Content-Range` value, if present.
pub(crate) fn content_range_value(lines: &[String]) -> Option<&str> {
    lines.iter().find_map(|l| {
        let (name, value) = l.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-range")
            .then(|| value.trim())
    })
}

/// Parse `bytes start-end/total` into `(start, end_inclusive)`.
pub(crate) fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let span = rest.split('/').next()?;
    let (a, b) = span.split_once('-')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Check that a response answers exactly `range`: status 206 and, when the
/// server sends one, a matching Content-Range.
pub(crate) fn check_range_response(
    code: u32,
    lines: &[String],
    range: &ByteRange,
) -> Result<(), FetchError> {
    if code != 206 {
        return Err(FetchError::UnexpectedStatus(code));
    }
    if let Some(raw) = content_range_value(lines) {
        if parse_content_range(raw) != Some((range.offset, range.end_inclusive())) {
            return Err(FetchError::ContentRangeMismatch {
                requested: range.range_header_value(),
                received: raw.to_string(),
            });
        }
    }
    Ok(())
}
