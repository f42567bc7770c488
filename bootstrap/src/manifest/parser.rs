//! Manifest deserialization.
//!
//! Parses a TOML manifest into the validated [`Manifest`] type. The raw serde
//! shapes stay private; every field is validated while converting into the
//! domain types, so a parsed manifest always satisfies the request
//! invariants.

use serde::Deserialize;

use super::{ArtifactRequest, CheckpointSource, HubVariant, Manifest, ManifestError, Variant};

const DEFAULT_REFERENCE: &str = "main";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    artifact: Vec<RawArtifact>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArtifact {
    name: String,
    #[serde(default)]
    snapshot: Vec<String>,
    #[serde(default)]
    hub: Vec<RawHubVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHubVariant {
    repo: String,
    #[serde(default = "default_reference", rename = "ref")]
    reference: String,
    entrypoint: String,
    #[serde(default)]
    checkpoints: Vec<String>,
}

fn default_reference() -> String {
    DEFAULT_REFERENCE.to_owned()
}

/// Parse a TOML string into a validated [`Manifest`].
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] for malformed TOML or unknown keys, and
/// the matching validation variant for semantically invalid entries.
///
/// # Examples
///
/// ```
/// use trellis_bootstrap::manifest::parse_manifest;
///
/// let toml = r#"
/// [[artifact]]
/// name = "BiRefNet"
/// snapshot = ["ZhengPeng7/BiRefNet"]
/// "#;
/// let manifest = parse_manifest(toml).expect("valid manifest");
/// assert_eq!(manifest.requests()[0].name(), "BiRefNet");
/// ```
pub fn parse_manifest(toml_text: &str) -> Result<Manifest, ManifestError> {
    let raw: RawManifest =
        toml::from_str(toml_text).map_err(|e| ManifestError::Parse(e.to_string()))?;
    let requests = raw
        .artifact
        .into_iter()
        .map(convert_artifact)
        .collect::<Result<Vec<_>, _>>()?;
    Manifest::new(requests)
}

fn convert_artifact(raw: RawArtifact) -> Result<ArtifactRequest, ManifestError> {
    if !raw.snapshot.is_empty() && !raw.hub.is_empty() {
        return Err(ManifestError::MixedStrategies { name: raw.name });
    }

    let variants = if raw.hub.is_empty() {
        raw.snapshot
            .into_iter()
            .map(Variant::snapshot)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        raw.hub
            .into_iter()
            .map(convert_hub_variant)
            .collect::<Result<Vec<_>, _>>()?
    };

    ArtifactRequest::new(raw.name, variants)
}

fn convert_hub_variant(raw: RawHubVariant) -> Result<Variant, ManifestError> {
    let checkpoints = raw
        .checkpoints
        .iter()
        .map(|value| CheckpointSource::parse(value))
        .collect::<Result<Vec<_>, _>>()?;
    let hub = HubVariant::new(raw.repo, raw.reference, raw.entrypoint, checkpoints)?;
    Ok(Variant::Hub(hub))
}
