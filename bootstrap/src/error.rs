//! Error types for the bootstrap binaries.
//!
//! These errors cover the setup phase that runs before the download pipeline
//! starts: resolving directories and loading a manifest. Failures inside the
//! pipeline never surface here; they are contained by the fetcher and the
//! orchestrator and reported as console lines instead.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::manifest::ManifestError;

/// Errors that can stop the bootstrap before any artifact is fetched.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The project root could not be determined.
    #[error("project root not found: {reason}")]
    ProjectRootNotFound {
        /// Description of why the root could not be resolved.
        reason: String,
    },

    /// The hub cache directory could not be determined.
    #[error("could not determine hub cache directory: {reason}")]
    CacheDirUnavailable {
        /// Description of why the cache directory is unavailable.
        reason: String,
    },

    /// A user-supplied manifest file could not be read.
    #[error("failed to read manifest {path}")]
    ManifestRead {
        /// Path to the manifest file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest was read but is not valid.
    #[error("invalid manifest {origin}: {source}")]
    InvalidManifest {
        /// Where the manifest came from (a path or `built-in`).
        origin: String,
        /// The validation or parse failure.
        #[source]
        source: ManifestError,
    },

    /// The `.env` file exists but could not be parsed.
    #[error("failed to load environment file {path}: {reason}")]
    EnvFile {
        /// Path to the `.env` file.
        path: Utf8PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`BootstrapError`].
pub type Result<T> = std::result::Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_read_preserves_source() {
        let err = BootstrapError::ManifestRead {
            path: Utf8PathBuf::from("/tmp/manifest.toml"),
            source: std::io::Error::other("permission denied"),
        };
        assert!(err.to_string().contains("/tmp/manifest.toml"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_manifest_names_origin_and_reason() {
        let err = BootstrapError::InvalidManifest {
            origin: "built-in".to_owned(),
            source: ManifestError::NoVariants {
                name: "BiRefNet".to_owned(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("built-in"));
        assert!(msg.contains("BiRefNet"));
    }

    #[test]
    fn env_file_error_includes_path() {
        let err = BootstrapError::EnvFile {
            path: Utf8PathBuf::from("/project/.env"),
            reason: "line 3: invalid".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/project/.env"));
        assert!(msg.contains("line 3"));
    }
}
