//! Console output helpers for the bootstrap binaries.
//!
//! All operator-facing progress is written through [`write_stderr_line`] into
//! an injected writer so that the status contract can be asserted in tests.
//! This module also formats the dry-run plan and the final summary line.

use camino::Utf8Path;
use std::io::Write;

use crate::manifest::{Manifest, Variant};
use crate::orchestrator::AcquisitionReport;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Line printed once the download pipeline has visited every artifact.
pub const COMPLETION_MESSAGE: &str = "All model weight downloads completed";

/// Format the summary printed after [`COMPLETION_MESSAGE`].
///
/// # Examples
///
/// ```
/// use trellis_bootstrap::output::summary_line;
///
/// assert_eq!(summary_line(1, 1), "1 of 1 artifact acquired");
/// assert_eq!(summary_line(3, 5), "3 of 5 artifacts acquired");
/// ```
#[must_use]
pub fn summary_line(acquired: usize, total: usize) -> String {
    let plural = if total == 1 { "artifact" } else { "artifacts" };
    format!("{acquired} of {total} {plural} acquired")
}

/// Write the completion message and summary for a finished run.
pub fn write_completion(report: &AcquisitionReport, stderr: &mut dyn Write) {
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, COMPLETION_MESSAGE);
    write_stderr_line(stderr, summary_line(report.acquired_count(), report.len()));
    for name in report.exhausted_names() {
        write_stderr_line(stderr, format!("  not acquired: {name}"));
    }
}

/// Configuration shown by `--dry-run`.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use trellis_bootstrap::manifest::Manifest;
/// use trellis_bootstrap::output::DryRunInfo;
///
/// let manifest = Manifest::builtin().expect("built-in manifest parses");
/// let weights = Utf8PathBuf::from("/srv/app/weights");
/// let cache = Utf8PathBuf::from("/home/user/.cache/torch/hub");
///
/// let info = DryRunInfo {
///     weights_dir: &weights,
///     hub_cache_dir: &cache,
///     endpoint: "https://huggingface.co",
///     token_present: false,
///     manifest: &manifest,
/// };
///
/// let text = info.display_text();
/// assert!(text.contains("Dry run"));
/// assert!(text.contains("BiRefNet"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Root directory for snapshot artifacts.
    pub weights_dir: &'a Utf8Path,
    /// Shared hub cache directory.
    pub hub_cache_dir: &'a Utf8Path,
    /// Hugging Face endpoint base URL.
    pub endpoint: &'a str,
    /// Whether a token was resolved.
    pub token_present: bool,
    /// The manifest that would be processed.
    pub manifest: &'a Manifest,
}

impl DryRunInfo<'_> {
    /// Format the dry-run plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - nothing will be downloaded".to_owned(),
            String::new(),
            format!("Weights directory: {}", self.weights_dir),
            format!("Hub cache: {}", self.hub_cache_dir),
            format!("Endpoint: {}", self.endpoint),
            format!("Token: {}", if self.token_present { "present" } else { "absent" }),
            String::new(),
            "Artifacts:".to_owned(),
        ];

        for request in self.manifest.requests() {
            lines.push(format!("  - {}", request.name()));
            for (index, variant) in request.variants().iter().enumerate() {
                let destination = match variant {
                    Variant::Snapshot { .. } => self.weights_dir.join(request.name()).to_string(),
                    Variant::Hub(_) => "hub cache".to_owned(),
                };
                lines.push(format!(
                    "      {}. {} -> {destination}",
                    index + 1,
                    variant.identifier()
                ));
            }
        }

        lines.join("\n")
    }
}
