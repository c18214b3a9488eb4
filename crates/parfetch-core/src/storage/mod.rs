//! Destination file lifecycle.
//!
//! Preallocates the `.part` file (fallocate on Unix when available, else
//! set_len), supports concurrent offset writes (pwrite), and either finalizes
//! with an atomic rename or discards the partial file.

mod builder;
mod error;
mod writer;

use std::path::{Path, PathBuf};

pub use builder::StorageWriterBuilder;
pub use error::FileIoError;
pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Create (or truncate) `path` and size it to exactly `size` bytes.
///
/// Returns a writer that every range worker can share; writers never extend
/// the file, they only fill spans inside `[0, size)`.
pub fn preallocate(path: &Path, size: u64) -> Result<StorageWriter, FileIoError> {
    let mut builder = StorageWriterBuilder::create(path)?;
    builder.preallocate(size)?;
    Ok(builder.build())
}
