//! Fallback orchestration across artifact variants.
//!
//! Each [`ArtifactRequest`] is resolved by trying its variants in declared
//! order and stopping at the first success. An artifact whose variants are
//! all exhausted is recorded and skipped; later artifacts are still
//! attempted. There are no retries of the same variant and no delays.

use camino::Utf8Path;
use log::warn;
use std::io::Write;

use crate::config::Layout;
use crate::fetch::{ArtifactSource, FetchContext, FetchOutcome, fetch_variant};
use crate::manifest::{ArtifactRequest, Manifest};
use crate::output::write_stderr_line;

/// The final state of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// One variant succeeded.
    Acquired {
        /// Zero-based position of the successful variant.
        variant_index: usize,
        /// Identifier of the successful variant.
        identifier: String,
    },
    /// Every variant failed.
    Exhausted {
        /// One failure message per attempted variant, in order.
        failures: Vec<String>,
    },
}

impl ArtifactStatus {
    /// Return true for [`ArtifactStatus::Acquired`].
    #[must_use]
    pub const fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired { .. })
    }
}

/// Per-artifact results of a run, in processing order.
///
/// The report is informational; the process exit status is not derived
/// from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionReport {
    entries: Vec<(String, ArtifactStatus)>,
}

impl AcquisitionReport {
    /// Record the status of an artifact.
    pub fn record(&mut self, name: impl Into<String>, status: ArtifactStatus) {
        self.entries.push((name.into(), status));
    }

    /// Entries in processing order.
    #[must_use]
    pub fn entries(&self) -> &[(String, ArtifactStatus)] {
        &self.entries
    }

    /// Look up the status recorded for `name`.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<&ArtifactStatus> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, status)| status)
    }

    /// Number of acquired artifacts.
    #[must_use]
    pub fn acquired_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, status)| status.is_acquired())
            .count()
    }

    /// Names of artifacts whose variants were all exhausted.
    pub fn exhausted_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, status)| !status.is_acquired())
            .map(|(name, _)| name.as_str())
    }

    /// Number of recorded artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Create the snapshot root, reporting rather than failing on error.
///
/// Returns false when the directory could not be created; individual
/// snapshot fetches will then fail on their own.
pub fn ensure_weights_dir(weights_dir: &Utf8Path, stderr: &mut dyn Write) -> bool {
    match std::fs::create_dir_all(weights_dir) {
        Ok(()) => true,
        Err(e) => {
            write_stderr_line(
                stderr,
                format!("Error creating weights directory {weights_dir}: {e}"),
            );
            false
        }
    }
}

/// Acquire one artifact by trying its variants in order.
pub fn acquire(
    request: &ArtifactRequest,
    source: &dyn ArtifactSource,
    layout: &Layout,
    context: FetchContext<'_>,
    stderr: &mut dyn Write,
) -> ArtifactStatus {
    let destination = layout.snapshot_destination(request.name());
    let mut failures = Vec::new();

    for (variant_index, variant) in request.variants().iter().enumerate() {
        if variant_index > 0 && !context.quiet {
            write_stderr_line(
                stderr,
                format!("Trying alternative {}...", variant.identifier()),
            );
        }
        match fetch_variant(source, variant, &destination, context, stderr) {
            FetchOutcome::Success { .. } => {
                return ArtifactStatus::Acquired {
                    variant_index,
                    identifier: variant.identifier(),
                };
            }
            FetchOutcome::Failure { message } => failures.push(message),
        }
    }

    warn!("all {} variants failed for {}", failures.len(), request.name());
    write_stderr_line(
        stderr,
        format!("All variants failed for {}; continuing", request.name()),
    );
    ArtifactStatus::Exhausted { failures }
}

/// Acquire every artifact of `manifest`, in order.
///
/// A failed artifact never prevents later artifacts from being attempted.
pub fn acquire_all(
    manifest: &Manifest,
    source: &dyn ArtifactSource,
    layout: &Layout,
    context: FetchContext<'_>,
    stderr: &mut dyn Write,
) -> AcquisitionReport {
    let mut report = AcquisitionReport::default();
    for request in manifest.requests() {
        let status = acquire(request, source, layout, context, stderr);
        report.record(request.name(), status);
    }
    report
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
