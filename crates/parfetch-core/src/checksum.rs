//! Post-download integrity check (SHA-256 or MD5 of the finished file).
//!
//! Digests are computed on demand after the transfer, never inline with the
//! range writes, so the hot path stays untouched.

use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const BUF_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Md5,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
            DigestAlgorithm::Md5 => write!(f, "md5"),
        }
    }
}

/// Digest the finished file must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDigest {
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex.
    pub hex: String,
}

impl ExpectedDigest {
    pub fn new(algorithm: DigestAlgorithm, hex: &str) -> Self {
        Self {
            algorithm,
            hex: hex.trim().to_ascii_lowercase(),
        }
    }
}

/// Parses `sha256:<hex>` or `md5:<hex>`.
impl FromStr for ExpectedDigest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algo, hex) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <algorithm>:<hex>, got {:?}", s))?;
        let algorithm = match algo.trim().to_ascii_lowercase().as_str() {
            "sha256" => DigestAlgorithm::Sha256,
            "md5" => DigestAlgorithm::Md5,
            other => return Err(format!("unsupported digest algorithm {:?}", other)),
        };
        let expected = ExpectedDigest::new(algorithm, hex);
        let want_len = match algorithm {
            DigestAlgorithm::Sha256 => 64,
            DigestAlgorithm::Md5 => 32,
        };
        if expected.hex.len() != want_len || !expected.hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("{} digest must be {} hex characters", algorithm, want_len));
        }
        Ok(expected)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{algorithm} of {} does not match: expected {expected}, got {actual}", path.display())]
    Mismatch {
        path: PathBuf,
        algorithm: DigestAlgorithm,
        expected: String,
        actual: String,
    },
}

fn digest_file<D: Digest>(path: &Path) -> Result<String, IntegrityError> {
    let io_err = |source| IntegrityError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut f = File::open(path).map_err(io_err)?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute SHA-256 of a file as lowercase hex. Reads in chunks; bounded memory.
pub fn sha256_path(path: &Path) -> Result<String, IntegrityError> {
    digest_file::<Sha256>(path)
}

/// Compute MD5 of a file as lowercase hex.
pub fn md5_path(path: &Path) -> Result<String, IntegrityError> {
    digest_file::<Md5>(path)
}

pub fn digest_path(path: &Path, algorithm: DigestAlgorithm) -> Result<String, IntegrityError> {
    match algorithm {
        DigestAlgorithm::Sha256 => sha256_path(path),
        DigestAlgorithm::Md5 => md5_path(path),
    }
}

/// Recompute the file digest and compare it with `expected`.
pub fn verify(path: &Path, expected: &ExpectedDigest) -> Result<(), IntegrityError> {
    let actual = digest_path(path, expected.algorithm)?;
    if actual != expected.hex {
        return Err(IntegrityError::Mismatch {
            path: path.to_path_buf(),
            algorithm: expected.algorithm,
            expected: expected.hex.clone(),
            actual,
        });
    }
    tracing::debug!(algorithm = %expected.algorithm, "digest verified for {}", path.display());
    Ok(())
}
