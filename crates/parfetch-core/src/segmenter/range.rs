//! Byte range type.

use std::fmt;

/// A contiguous span of the remote resource: `length` bytes starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub offset: u64,
    /// Number of bytes; never 0 inside a plan.
    pub length: u64,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Inclusive end offset, as used by HTTP Range. Only meaningful for `length > 0`.
    pub fn end_inclusive(&self) -> u64 {
        self.end().saturating_sub(1)
    }

    /// HTTP Range header value (inclusive end): `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.offset, self.end_inclusive())
    }

    /// Range value in the form curl's `CURLOPT_RANGE` expects (`start-end`, no unit).
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.offset, self.end_inclusive())
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.offset, self.end_inclusive())
    }
}
