//! Extraction of hub code archives.
//!
//! Code repositories arrive as branch zip archives whose entries all sit
//! under a single `<repo>-<ref>/` directory. That top-level directory is
//! stripped so the code lands directly in the destination.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip container is unreadable.
    #[error("invalid zip archive: {0}")]
    Zip(String),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

impl From<zip::result::ZipError> for ExtractionError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io_err) => Self::Io(io_err),
            other => Self::Zip(other.to_string()),
        }
    }
}

/// Extract `archive_path` into `dest_dir`, dropping the first path component
/// of every entry.
///
/// Returns the number of files written.
///
/// # Errors
///
/// Returns [`ExtractionError::PathTraversal`] if any entry escapes the
/// destination, [`ExtractionError::EmptyArchive`] if no files were found
/// and [`ExtractionError::Io`] or [`ExtractionError::Zip`] on read failures.
pub fn extract_zip_stripping_root(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(dest_dir)?;
    let mut extracted = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_path = PathBuf::from(entry.name());
        validate_entry_path(&entry_path)?;

        let Some(relative) = strip_root(&entry_path) else {
            continue;
        };
        let dest_path = dest_dir.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&dest_path)?;
        io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }

    if extracted == 0 {
        return Err(ExtractionError::EmptyArchive);
    }
    Ok(extracted)
}

/// Drop the first component, returning `None` for the root entry itself.
fn strip_root(path: &Path) -> Option<PathBuf> {
    let stripped: PathBuf = path.components().skip(1).collect();
    (!stripped.as_os_str().is_empty()).then_some(stripped)
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
