//! Destination file errors.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FileIoError {
    #[error("failed to create {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("failed to preallocate {size} bytes: {source}")]
    Preallocate { size: u64, source: io::Error },
    #[error("write at offset {offset} failed: {source}")]
    Write { offset: u64, source: io::Error },
    #[error("short write at offset {offset}: {written} of {len} bytes")]
    ShortWrite { offset: u64, written: usize, len: usize },
    #[error("sync failed: {0}")]
    Sync(io::Error),
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("failed to remove {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },
}
