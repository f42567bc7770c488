//! SHA-256 verification of downloaded repository files.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn compute_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Outcome of comparing a file against its published digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestCheck {
    /// The digests agree.
    Match,
    /// The digests differ; carries the actual digest.
    Mismatch(String),
}

/// Compare the file at `path` against `expected` (case-insensitive hex).
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn check_sha256(path: &Path, expected: &str) -> std::io::Result<DigestCheck> {
    let actual = compute_sha256(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(DigestCheck::Match)
    } else {
        Ok(DigestCheck::Mismatch(actual))
    }
}
