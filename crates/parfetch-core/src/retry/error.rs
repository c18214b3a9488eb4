//! Range fetch error type.

/// Error returned by a single range fetch. Kept typed (rather than anyhow) so
/// the retry policy can classify it and the orchestrator can report it per range.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, DNS, etc.).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// Response status was not 206 Partial Content.
    #[error("unexpected HTTP status {0} (expected 206)")]
    UnexpectedStatus(u32),
    /// Server answered 206 for a different span than the one requested.
    #[error("Content-Range mismatch: requested {requested}, got {received}")]
    ContentRangeMismatch { requested: String, received: String },
    /// Transfer ended with fewer bytes than the range length (e.g. server closed early).
    #[error("short read: expected {expected} bytes, got {received}")]
    ShortRead { expected: u64, received: u64 },
    /// Server sent more bytes than the range length.
    #[error("overlong body: expected {expected} bytes")]
    Overflow { expected: u64 },
    /// Stopped through the cancel token.
    #[error("cancelled")]
    Cancelled,
}
