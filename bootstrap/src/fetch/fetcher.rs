//! Single-variant fetch attempts.
//!
//! [`fetch_variant`] is the containment boundary of the fetch layer: it
//! dispatches one variant to its strategy, prints the per-attempt status
//! lines and folds every error into a [`FetchOutcome`]. Nothing beneath it
//! can abort the run.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::io::Write;

use super::download::HubClient;
use super::error::FetchError;
use super::hub_cache::load_hub_variant;
use super::snapshot::snapshot_repo;
use crate::config::Layout;
use crate::credential::Credential;
use crate::manifest::{HubVariant, Variant};
use crate::output::write_stderr_line;

/// Hint printed after failures that a token could resolve.
pub const PRIVATE_MODEL_HINT: &str =
    "If this is a private model, make sure you have provided a valid Hugging Face token.";

/// The two fetch strategies, behind a seam so orchestration can be tested
/// without touching the network or the filesystem.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactSource {
    /// Mirror a model repository into `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the snapshot cannot be completed.
    fn snapshot(
        &self,
        repo_id: &str,
        destination: &Utf8Path,
        credential: &Credential,
    ) -> Result<Utf8PathBuf, FetchError>;

    /// Place a hub variant in the shared hub cache.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the code or a checkpoint cannot be
    /// installed.
    fn hub(&self, variant: &HubVariant, credential: &Credential) -> Result<Utf8PathBuf, FetchError>;
}

/// [`ArtifactSource`] backed by a [`HubClient`] and a directory layout.
#[derive(Debug)]
pub struct HubArtifactSource<C> {
    client: C,
    layout: Layout,
}

impl<C: HubClient> HubArtifactSource<C> {
    /// Create a source writing into `layout`.
    pub const fn new(client: C, layout: Layout) -> Self {
        Self { client, layout }
    }
}

impl<C: HubClient> ArtifactSource for HubArtifactSource<C> {
    fn snapshot(
        &self,
        repo_id: &str,
        destination: &Utf8Path,
        credential: &Credential,
    ) -> Result<Utf8PathBuf, FetchError> {
        let summary = snapshot_repo(&self.client, repo_id, destination, credential)?;
        debug!(
            "{repo_id}: {} downloaded, {} already present",
            summary.downloaded, summary.skipped
        );
        Ok(destination.to_owned())
    }

    fn hub(&self, variant: &HubVariant, credential: &Credential) -> Result<Utf8PathBuf, FetchError> {
        load_hub_variant(&self.client, &self.layout, variant, credential)
    }
}

/// The terminal result of one fetch attempt.
///
/// Not a `Result`: a failed attempt is answered by trying the next variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The artifact is in place.
    Success {
        /// Where the artifact was written.
        location: Utf8PathBuf,
    },
    /// The attempt failed.
    Failure {
        /// A human-readable explanation.
        message: String,
    },
}

impl FetchOutcome {
    /// Return true for [`FetchOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Options shared by every attempt in a run.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    /// The token to send, if any.
    pub credential: &'a Credential,
    /// When true, suppress progress lines. Failure lines are always shown.
    pub quiet: bool,
}

/// Attempt one variant.
///
/// Snapshot variants are written to `destination`; hub variants ignore it
/// and write into the hub cache. Progress and failures are reported on
/// `stderr`.
pub fn fetch_variant(
    source: &dyn ArtifactSource,
    variant: &Variant,
    destination: &Utf8Path,
    context: FetchContext<'_>,
    stderr: &mut dyn Write,
) -> FetchOutcome {
    let identifier = variant.identifier();
    if !context.quiet {
        write_stderr_line(stderr, format!("Downloading {identifier}..."));
    }

    let result = match variant {
        Variant::Snapshot { repo_id } => source.snapshot(repo_id, destination, context.credential),
        Variant::Hub(hub) => source.hub(hub, context.credential),
    };

    match result {
        Ok(location) => {
            if !context.quiet {
                write_stderr_line(
                    stderr,
                    format!("Successfully downloaded {identifier} to {location}"),
                );
            }
            FetchOutcome::Success { location }
        }
        Err(err) => {
            write_stderr_line(stderr, format!("Error downloading {identifier}: {err}"));
            if err.suggests_credential() {
                write_stderr_line(stderr, PRIVATE_MODEL_HINT);
            }
            FetchOutcome::Failure {
                message: err.to_string(),
            }
        }
    }
}
