//! Concurrent offset writer for the download file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

use super::error::FileIoError;

/// Writer for the download file. Safe to clone and use from multiple workers;
/// each `write_at` is independent (pwrite-style) and targets a disjoint span.
#[derive(Clone, Debug)]
pub struct StorageWriter {
    file: Arc<File>,
    path: PathBuf,
}

impl StorageWriter {
    pub(crate) fn from_file_and_path(file: File, path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            path,
        }
    }

    /// Write all of `data` at `offset`. Does not move the file cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), FileIoError> {
        let mut written = 0usize;
        while written < data.len() {
            let pos = offset + written as u64;
            let n = self
                .file
                .write_at(&data[written..], pos)
                .map_err(|source| FileIoError::Write { offset: pos, source })?;
            if n == 0 {
                return Err(FileIoError::ShortWrite {
                    offset,
                    written,
                    len: data.len(),
                });
            }
            written += n;
        }
        Ok(())
    }

    /// Non-Unix fallback: seek + write on a cloned handle. The clone shares the
    /// cursor, so callers on these platforms must not write concurrently.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), FileIoError> {
        use std::io::{Seek, SeekFrom, Write};
        let io = |source| FileIoError::Write { offset, source };
        let mut f = self.file.try_clone().map_err(io)?;
        f.seek(SeekFrom::Start(offset)).map_err(io)?;
        f.write_all(data).map_err(io)?;
        Ok(())
    }

    /// Flush file data and metadata to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> Result<(), FileIoError> {
        self.file.sync_all().map_err(FileIoError::Sync)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename the file to `final_path`, replacing any previous file
    /// there. Consumes the writer; other clones must already be dropped.
    pub fn finalize(self, final_path: &Path) -> Result<(), FileIoError> {
        let from = self.path.clone();
        drop(self.file);

        std::fs::rename(&from, final_path).map_err(|source| FileIoError::Rename {
            from,
            to: final_path.to_path_buf(),
            source,
        })
    }

    /// Close and delete the file. Used when a transfer fails so a partial file
    /// is never mistaken for a complete one.
    pub fn discard(self) -> Result<(), FileIoError> {
        let path = self.path.clone();
        drop(self.file);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FileIoError::Remove { path, source }),
        }
    }
}
