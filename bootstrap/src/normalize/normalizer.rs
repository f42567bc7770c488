//! Derivation of the fixed entry script.
//!
//! [`normalize`] reads the source script, applies each rewrite rule once and
//! writes the result beside the source as `<stem>_fixed.<ext>`. The source
//! file is only ever read.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use super::rules::{RewriteRule, apply_rule, default_rules};
use crate::config::executable_project_root;
use crate::output::write_stderr_line;

/// File name of the entry script.
pub const APP_FILE_NAME: &str = "app.py";

/// Suffix appended to the stem of the derived file.
pub const FIXED_SUFFIX: &str = "_fixed";

/// Errors raised while deriving the fixed script.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The source script does not exist.
    #[error("{path} not found")]
    SourceNotFound {
        /// The missing path.
        path: Utf8PathBuf,
    },

    /// The source script could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The source path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The derived script could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The derived path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A rewrite pattern failed to compile.
    #[error("invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Path of the derived script for `source`.
///
/// # Examples
///
/// ```
/// use camino::{Utf8Path, Utf8PathBuf};
/// use trellis_bootstrap::normalize::derived_path;
///
/// assert_eq!(
///     derived_path(Utf8Path::new("/srv/trellis/app.py")),
///     Utf8PathBuf::from("/srv/trellis/app_fixed.py")
/// );
/// assert_eq!(derived_path(Utf8Path::new("launch")), Utf8PathBuf::from("launch_fixed"));
/// ```
#[must_use]
pub fn derived_path(source: &Utf8Path) -> Utf8PathBuf {
    let stem = source.file_stem().unwrap_or(APP_FILE_NAME);
    let file_name = match source.extension() {
        Some(extension) => format!("{stem}{FIXED_SUFFIX}.{extension}"),
        None => format!("{stem}{FIXED_SUFFIX}"),
    };
    source.with_file_name(file_name)
}

/// Derive the fixed script for `source` using the built-in rules.
///
/// Returns the path of the written file.
///
/// # Errors
///
/// Returns [`NormalizeError::SourceNotFound`] when `source` does not exist
/// and [`NormalizeError::Read`] or [`NormalizeError::Write`] on I/O
/// failures.
pub fn normalize(source: &Utf8Path) -> Result<Utf8PathBuf, NormalizeError> {
    let rules = default_rules()?;
    normalize_with(source, &rules)
}

/// Derive the fixed script for `source` using `rules`.
///
/// # Errors
///
/// See [`normalize`].
pub fn normalize_with(source: &Utf8Path, rules: &[RewriteRule]) -> Result<Utf8PathBuf, NormalizeError> {
    if !source.is_file() {
        return Err(NormalizeError::SourceNotFound {
            path: source.to_owned(),
        });
    }
    let original = std::fs::read_to_string(source).map_err(|e| NormalizeError::Read {
        path: source.to_owned(),
        source: e,
    })?;

    let rewritten = rules.iter().fold(original, |text, rule| {
        let changed = match apply_rule(&text, rule) {
            Cow::Owned(changed) => Some(changed),
            Cow::Borrowed(_) => None,
        };
        if changed.is_some() {
            debug!("applied rule {}", rule.name());
        }
        changed.unwrap_or(text)
    });

    let target = derived_path(source);
    std::fs::write(&target, rewritten).map_err(|e| NormalizeError::Write {
        path: target.clone(),
        source: e,
    })?;
    Ok(target)
}

/// Run the normalizer and report the result on `stderr`.
///
/// Returns true when the derived file was written.
pub fn run_normalize(source: &Utf8Path, stderr: &mut dyn Write) -> bool {
    let label = source.file_name().unwrap_or(APP_FILE_NAME);
    match normalize(source) {
        Ok(target) => {
            write_stderr_line(stderr, format!("Created fixed {label} at: {target}"));
            true
        }
        Err(e) => {
            write_stderr_line(stderr, format!("Error fixing {label}: {e}"));
            false
        }
    }
}

/// Default location of the entry script.
///
/// Tools are installed as `<project>/<dir>/<tool>`, so the script is looked
/// up in the parent of the executable's directory. Falls back to `app.py` in
/// the working directory when the executable path is unknown.
#[must_use]
pub fn default_source_path(executable: Option<&Path>) -> Utf8PathBuf {
    executable_project_root(executable).map_or_else(
        || Utf8PathBuf::from(APP_FILE_NAME),
        |project| project.join(APP_FILE_NAME),
    )
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;
