//! Builder for creating and preallocating the download file.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::error::FileIoError;
use super::writer::StorageWriter;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Builder for a new download file. Call `preallocate` then `build` to get
/// a `StorageWriter` that supports concurrent `write_at` from multiple workers.
pub struct StorageWriterBuilder {
    file: File,
    path: PathBuf,
}

impl StorageWriterBuilder {
    /// Create a new file at `path` (e.g. `destination.part`). Truncates if it exists.
    pub fn create(path: &Path) -> Result<Self, FileIoError> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| FileIoError::Create {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(StorageWriterBuilder {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Preallocate `size` bytes. On Linux tries `posix_fallocate` for real block
    /// allocation so a full disk fails here rather than mid-transfer; falls back
    /// to `set_len` (sparse) on failure or other platforms.
    pub fn preallocate(&mut self, size: u64) -> Result<(), FileIoError> {
        #[cfg(target_os = "linux")]
        {
            if size > 0 {
                let fd = self.file.as_raw_fd();
                let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
                if r == 0 {
                    return Ok(());
                }
                if r == libc::ENOSPC {
                    return Err(FileIoError::Preallocate {
                        size,
                        source: std::io::Error::from_raw_os_error(r),
                    });
                }
                tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
            }
        }
        self.file
            .set_len(size)
            .map_err(|source| FileIoError::Preallocate { size, source })
    }

    /// Finish building and return a writer that can be shared for concurrent writes.
    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file_and_path(self.file, self.path)
    }
}
