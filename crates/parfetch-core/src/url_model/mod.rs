//! Default output filename from the URL.
//!
//! Used when the caller gives no destination path: the last URL path segment,
//! sanitized for the local filesystem, or `download.bin`.

mod path;
mod sanitize;

pub use path::last_path_segment;
pub use sanitize::sanitize_filename;

/// Fallback when the URL path yields nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Derives a safe local filename for `url`.
///
/// - `output_filename("https://example.com/archive.zip")` → `"archive.zip"`
/// - `output_filename("https://example.com/")` → `"download.bin"`
pub fn output_filename(url: &str) -> String {
    let sanitized = match last_path_segment(url) {
        Some(raw) => sanitize_filename(&raw),
        None => return DEFAULT_FILENAME.to_string(),
    };
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}
