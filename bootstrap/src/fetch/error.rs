//! Error types for the fetch layer.
//!
//! [`DownloadError`] describes a single HTTP transfer; [`FetchError`]
//! describes why a whole variant attempt failed. Neither escapes
//! [`fetch_variant`](super::fetcher::fetch_variant): both are rendered into
//! a [`FetchOutcome::Failure`](super::fetcher::FetchOutcome) message.

use camino::Utf8PathBuf;

use super::extraction::ExtractionError;

/// Errors arising from one HTTP transfer.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The request failed in transport or with an unexpected status.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The remote resource does not exist (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The remote refused access (HTTP 401 or 403).
    #[error("access denied ({status}) for {url}")]
    Unauthorized {
        /// The URL that was refused.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be understood.
    #[error("unexpected response from {url}: {reason}")]
    InvalidResponse {
        /// The URL that was requested.
        url: String,
        /// Why the body was rejected.
        reason: String,
    },

    /// Writing the downloaded bytes failed.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that fail one variant attempt.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A transfer failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// A local filesystem operation failed.
    #[error("{action} {path}: {source}")]
    Io {
        /// What was being done, such as "create directory".
        action: &'static str,
        /// The path involved.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A downloaded file does not match its published digest.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The repository path of the file.
        path: String,
        /// The published SHA-256.
        expected: String,
        /// The SHA-256 of the received bytes.
        actual: String,
    },

    /// A repository listed a file outside the destination directory.
    #[error("refusing unsafe repository path {path}")]
    UnsafePath {
        /// The offending path.
        path: String,
    },

    /// The repository has no files at the requested revision.
    #[error("repository {repo_id} has no files")]
    EmptyRepository {
        /// The repository identifier.
        repo_id: String,
    },

    /// A hub code archive could not be extracted.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The hub repository does not define the requested entrypoint.
    #[error("cannot find callable {entrypoint} in hubconf.py of {repo}")]
    MissingEntrypoint {
        /// The requested callable.
        entrypoint: String,
        /// The code repository.
        repo: String,
    },
}

impl FetchError {
    /// Return true when a missing or invalid token is a plausible cause.
    #[must_use]
    pub const fn suggests_credential(&self) -> bool {
        matches!(
            self,
            Self::Download(DownloadError::Unauthorized { .. } | DownloadError::NotFound { .. })
        )
    }

    pub(crate) fn io(action: &'static str, path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
