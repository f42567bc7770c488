//! Artifact manifest: which model weights to fetch and from where.
//!
//! A [`Manifest`] is an ordered list of [`ArtifactRequest`]s. Each request
//! names one logical artifact and lists its [`Variant`]s in the order they
//! should be tried. Manifests are declared in TOML; the binary ships a
//! built-in manifest and accepts a replacement file on the command line.
//!
//! # Sub-modules
//!
//! - [`parser`] - TOML deserialization and validation

pub mod parser;

use std::fmt;
use thiserror::Error;

pub use parser::parse_manifest;

/// Built-in manifest describing the weights the application needs.
const BUILTIN_MANIFEST: &str = include_str!("default_manifest.toml");

/// Errors raised while parsing or validating a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// The TOML document could not be deserialized.
    #[error("manifest parse error: {0}")]
    Parse(String),

    /// An artifact declares no variants.
    #[error("artifact \"{name}\" declares no variants")]
    NoVariants {
        /// The artifact name.
        name: String,
    },

    /// An artifact declares both snapshot and hub variants.
    #[error("artifact \"{name}\" mixes snapshot and hub variants")]
    MixedStrategies {
        /// The artifact name.
        name: String,
    },

    /// An artifact name cannot be used as a directory name.
    #[error("invalid artifact name \"{name}\": {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Two artifacts share a name.
    #[error("duplicate artifact name \"{name}\"")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A repository identifier is not of the form `owner/name`.
    #[error("invalid repository identifier \"{value}\"; expected owner/name")]
    InvalidRepoId {
        /// The rejected identifier.
        value: String,
    },

    /// A checkpoint reference is neither `hf://owner/name` nor an HTTPS URL.
    #[error("invalid checkpoint \"{value}\"; expected hf://owner/name or an https:// URL")]
    InvalidCheckpoint {
        /// The rejected reference.
        value: String,
    },

    /// A hub entrypoint is empty or not an identifier.
    #[error("invalid entrypoint \"{value}\"")]
    InvalidEntrypoint {
        /// The rejected entrypoint.
        value: String,
    },
}

/// A checkpoint fetched alongside a hub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSource {
    /// A Hugging Face model repository, written `hf://owner/name`.
    HfRepo(String),
    /// A single checkpoint file at an HTTPS URL.
    Url(String),
}

impl CheckpointSource {
    /// Parse a checkpoint reference.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidCheckpoint`] for unsupported schemes and
    /// [`ManifestError::InvalidRepoId`] for malformed `hf://` references.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_bootstrap::manifest::CheckpointSource;
    ///
    /// let hf = CheckpointSource::parse("hf://Stable-X/yoso-normal-v0-3").unwrap();
    /// assert_eq!(hf, CheckpointSource::HfRepo("Stable-X/yoso-normal-v0-3".to_owned()));
    ///
    /// assert!(CheckpointSource::parse("ftp://example.com/x.pth").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, ManifestError> {
        if let Some(repo_id) = value.strip_prefix("hf://") {
            validate_repo_id(repo_id)?;
            return Ok(Self::HfRepo(repo_id.to_owned()));
        }
        if value.starts_with("https://") && url_file_name(value).is_some() {
            return Ok(Self::Url(value.to_owned()));
        }
        Err(ManifestError::InvalidCheckpoint {
            value: value.to_owned(),
        })
    }

    /// Short label used in identifiers and console output.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::HfRepo(repo_id) => repo_id,
            Self::Url(url) => url_file_name(url).unwrap_or(url),
        }
    }
}

/// Return the last path segment of an URL, ignoring any query string.
pub(crate) fn url_file_name(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let (_, rest) = without_query.split_once("://")?;
    let (_, path) = rest.split_once('/')?;
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
}

/// A torch-hub style variant: a code repository plus checkpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubVariant {
    repo: String,
    reference: String,
    entrypoint: String,
    checkpoints: Vec<CheckpointSource>,
}

impl HubVariant {
    /// Create a hub variant after validating its fields.
    ///
    /// # Errors
    ///
    /// Returns an error when `repo` is not `owner/name` or the entrypoint is
    /// not a valid identifier.
    pub fn new(
        repo: impl Into<String>,
        reference: impl Into<String>,
        entrypoint: impl Into<String>,
        checkpoints: Vec<CheckpointSource>,
    ) -> Result<Self, ManifestError> {
        let repo = repo.into();
        let entrypoint = entrypoint.into();
        validate_repo_id(&repo)?;
        let is_identifier = entrypoint
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && entrypoint
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_identifier {
            return Err(ManifestError::InvalidEntrypoint { value: entrypoint });
        }
        Ok(Self {
            repo,
            reference: reference.into(),
            entrypoint,
            checkpoints,
        })
    }

    /// The `owner/name` code repository.
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// The branch to fetch.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The callable the consumer loads from `hubconf.py`.
    #[must_use]
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// Checkpoints fetched into the hub cache.
    #[must_use]
    pub fn checkpoints(&self) -> &[CheckpointSource] {
        &self.checkpoints
    }

    /// Directory name of the extracted code inside the hub cache.
    ///
    /// Follows the `{owner}_{name}_{ref}` convention of torch hub.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_bootstrap::manifest::HubVariant;
    ///
    /// let variant = HubVariant::new("facebookresearch/dinov2", "main", "dinov2_vitl14", vec![]).unwrap();
    /// assert_eq!(variant.cache_dir_name(), "facebookresearch_dinov2_main");
    /// ```
    #[must_use]
    pub fn cache_dir_name(&self) -> String {
        let (owner, name) = self.repo.split_once('/').unwrap_or((&self.repo, ""));
        let reference = self.reference.replace('/', "_");
        format!("{owner}_{name}_{reference}")
    }
}

/// One remote identifier for a logical artifact, with its fetch strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Snapshot of a Hugging Face repository into an explicit directory.
    Snapshot {
        /// The `owner/name` repository.
        repo_id: String,
    },
    /// Code and checkpoints placed in the shared hub cache.
    Hub(HubVariant),
}

impl Variant {
    /// Create a snapshot variant.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidRepoId`] when `repo_id` is malformed.
    pub fn snapshot(repo_id: impl Into<String>) -> Result<Self, ManifestError> {
        let repo_id = repo_id.into();
        validate_repo_id(&repo_id)?;
        Ok(Self::Snapshot { repo_id })
    }

    /// A stable, human-readable identifier for console output.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self {
            Self::Snapshot { repo_id } => repo_id.clone(),
            Self::Hub(hub) => {
                let base = format!("{}:{}", hub.repo, hub.entrypoint);
                if hub.checkpoints.is_empty() {
                    base
                } else {
                    let labels: Vec<&str> = hub.checkpoints.iter().map(CheckpointSource::label).collect();
                    format!("{base} ({})", labels.join(", "))
                }
            }
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

/// One logical artifact and its ordered variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    name: String,
    variants: Vec<Variant>,
}

impl ArtifactRequest {
    /// Create a request, enforcing a usable name and at least one variant.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::NoVariants`] for an empty variant list and
    /// [`ManifestError::InvalidName`] for names that are not a single path
    /// component.
    pub fn new(name: impl Into<String>, variants: Vec<Variant>) -> Result<Self, ManifestError> {
        let name = name.into();
        validate_artifact_name(&name)?;
        if variants.is_empty() {
            return Err(ManifestError::NoVariants { name });
        }
        Ok(Self { name, variants })
    }

    /// The logical artifact name, also its local directory alias.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variants in the order they are tried.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }
}

/// An ordered list of artifact requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    requests: Vec<ArtifactRequest>,
}

impl Manifest {
    /// Build a manifest, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicateName`] when two requests share a name.
    pub fn new(requests: Vec<ArtifactRequest>) -> Result<Self, ManifestError> {
        for (index, request) in requests.iter().enumerate() {
            let repeated = requests
                .iter()
                .take(index)
                .any(|earlier| earlier.name == request.name);
            if repeated {
                return Err(ManifestError::DuplicateName {
                    name: request.name.clone(),
                });
            }
        }
        Ok(Self { requests })
    }

    /// Parse the built-in manifest.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded manifest is malformed.
    pub fn builtin() -> Result<Self, ManifestError> {
        parse_manifest(BUILTIN_MANIFEST)
    }

    /// Requests in processing order.
    #[must_use]
    pub fn requests(&self) -> &[ArtifactRequest] {
        &self.requests
    }

    /// Number of requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Return true when the manifest has no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

fn validate_repo_id(value: &str) -> Result<(), ManifestError> {
    let invalid = || ManifestError::InvalidRepoId {
        value: value.to_owned(),
    };
    let (owner, name) = value.split_once('/').ok_or_else(invalid)?;
    let segment_ok = |segment: &str| {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if segment_ok(owner) && segment_ok(name) {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn validate_artifact_name(name: &str) -> Result<(), ManifestError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ManifestError::InvalidName {
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
