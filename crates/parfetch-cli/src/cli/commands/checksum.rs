//! Checksum command: compute SHA-256 (or MD5) of a file.

use anyhow::Result;
use parfetch_core::checksum::{self, DigestAlgorithm};
use std::path::Path;

/// Compute and print the digest of the given file, `sha256sum` style.
pub async fn run_checksum(path: &Path, md5: bool) -> Result<()> {
    let algorithm = if md5 {
        DigestAlgorithm::Md5
    } else {
        DigestAlgorithm::Sha256
    };
    let owned = path.to_path_buf();
    let digest =
        tokio::task::spawn_blocking(move || checksum::digest_path(&owned, algorithm)).await??;
    println!("{}  {}", digest, path.display());
    Ok(())
}
