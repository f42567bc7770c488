//! Runtime configuration: directory layout, endpoints and `.env` loading.
//!
//! Everything the pipeline needs to know about where to read and write is
//! resolved here once, before any fetch starts, and then passed down
//! explicitly.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::path::Path;

use crate::dirs::{BaseDirs, hub_cache_dir};
use crate::error::{BootstrapError, Result};
use crate::manifest::{HubVariant, Manifest, parse_manifest};

/// Environment variable overriding the Hugging Face endpoint.
pub const ENDPOINT_ENV_VAR: &str = "HF_ENDPOINT";

/// Default Hugging Face endpoint.
pub const DEFAULT_HF_ENDPOINT: &str = "https://huggingface.co";

/// Base URL for hub code repositories.
pub const DEFAULT_GITHUB_BASE: &str = "https://github.com";

/// Name of the snapshot artifacts directory under the project root.
pub const WEIGHTS_DIR_NAME: &str = "weights";

/// Name of the environment file loaded from the project root.
pub const ENV_FILE_NAME: &str = ".env";

/// Remote base URLs used by the fetchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Hugging Face base URL, without a trailing slash.
    pub huggingface: String,
    /// Code repository base URL, without a trailing slash.
    pub github: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            huggingface: DEFAULT_HF_ENDPOINT.to_owned(),
            github: DEFAULT_GITHUB_BASE.to_owned(),
        }
    }
}

impl Endpoints {
    /// Resolve endpoints from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve endpoints using an injected variable lookup.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_bootstrap::config::Endpoints;
    ///
    /// let endpoints = Endpoints::from_lookup(|_| Some("https://hf-mirror.example/".to_owned()));
    /// assert_eq!(endpoints.huggingface, "https://hf-mirror.example");
    /// ```
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let huggingface = lookup(ENDPOINT_ENV_VAR)
            .map(|value| value.trim().trim_end_matches('/').to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_HF_ENDPOINT.to_owned());
        Self {
            huggingface,
            ..Self::default()
        }
    }
}

/// Where artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Project root; `.env` is read from here.
    pub project_root: Utf8PathBuf,
    /// Root directory for snapshot artifacts.
    pub weights_dir: Utf8PathBuf,
    /// Root of the shared hub cache.
    pub hub_cache_dir: Utf8PathBuf,
}

impl Layout {
    /// Destination directory for a snapshot artifact.
    #[must_use]
    pub fn snapshot_destination(&self, artifact_name: &str) -> Utf8PathBuf {
        self.weights_dir.join(artifact_name)
    }

    /// Directory holding the extracted code of a hub variant.
    #[must_use]
    pub fn hub_repo_dir(&self, variant: &HubVariant) -> Utf8PathBuf {
        self.hub_cache_dir.join(variant.cache_dir_name())
    }

    /// Directory holding hub checkpoints.
    #[must_use]
    pub fn checkpoints_dir(&self) -> Utf8PathBuf {
        self.hub_cache_dir.join("checkpoints")
    }
}

/// Project directory of a tool installed as `<project>/<dir>/<tool>`.
///
/// Returns `None` when the executable path is unknown, has no grandparent
/// or is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use trellis_bootstrap::config::executable_project_root;
///
/// let exe = Path::new("/srv/trellis/scripts/trellis-download-weights");
/// assert_eq!(
///     executable_project_root(Some(exe)).as_deref(),
///     Some(camino::Utf8Path::new("/srv/trellis"))
/// );
/// assert_eq!(executable_project_root(None), None);
/// ```
#[must_use]
pub fn executable_project_root(executable: Option<&Path>) -> Option<Utf8PathBuf> {
    executable
        .and_then(|exe| exe.parent()?.parent())
        .filter(|project| !project.as_os_str().is_empty())
        .and_then(Utf8Path::from_path)
        .map(Utf8Path::to_owned)
}

/// Resolve the directory layout.
///
/// `project_root` defaults to the project the `executable` is installed in
/// (see [`executable_project_root`]), then to the current directory.
/// `weights_dir` defaults to `<project root>/weights`.
///
/// # Errors
///
/// Returns an error when no project root can be determined or the hub cache
/// directory cannot be determined or is not valid UTF-8.
pub fn resolve_layout(
    project_root: Option<&Utf8Path>,
    weights_dir: Option<&Utf8Path>,
    executable: Option<&Path>,
    dirs: &dyn BaseDirs,
) -> Result<Layout> {
    let project_root = match project_root {
        Some(root) => root.to_owned(),
        None => match executable_project_root(executable) {
            Some(root) => root,
            None => current_dir_utf8()?,
        },
    };
    debug!("project root: {project_root}");
    let weights_dir = weights_dir.map_or_else(
        || project_root.join(WEIGHTS_DIR_NAME),
        Utf8Path::to_owned,
    );
    let hub_cache_dir = hub_cache_dir(dirs).ok_or_else(|| BootstrapError::CacheDirUnavailable {
        reason: "neither TORCH_HOME nor a platform cache directory is available".to_owned(),
    })?;
    let hub_cache_dir =
        Utf8PathBuf::from_path_buf(hub_cache_dir).map_err(|path| BootstrapError::CacheDirUnavailable {
            reason: format!("cache directory is not valid UTF-8: {}", path.display()),
        })?;

    Ok(Layout {
        project_root,
        weights_dir,
        hub_cache_dir,
    })
}

fn current_dir_utf8() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|e| BootstrapError::ProjectRootNotFound {
        reason: format!("current directory is not valid UTF-8: {e}"),
    })
}

/// Load `<project root>/.env` into the process environment.
///
/// Variables already set in the environment keep their values. Returns
/// `Ok(false)` when there is no `.env` file.
///
/// # Errors
///
/// Returns [`BootstrapError::EnvFile`] when the file exists but cannot be
/// parsed.
pub fn load_env_file(project_root: &Utf8Path) -> Result<bool> {
    let path = project_root.join(ENV_FILE_NAME);
    if !path.is_file() {
        debug!("no environment file at {path}");
        return Ok(false);
    }
    dotenvy::from_path(path.as_std_path()).map_err(|e| BootstrapError::EnvFile {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    debug!("loaded environment file {path}");
    Ok(true)
}

/// Load the manifest at `path`, or the built-in manifest when `path` is
/// `None`.
///
/// # Errors
///
/// Returns [`BootstrapError::ManifestRead`] when the file cannot be read and
/// [`BootstrapError::InvalidManifest`] when it does not validate.
pub fn load_manifest(path: Option<&Utf8Path>) -> Result<Manifest> {
    let Some(path) = path else {
        return Manifest::builtin().map_err(|source| BootstrapError::InvalidManifest {
            origin: "built-in".to_owned(),
            source,
        });
    };
    let text = std::fs::read_to_string(path).map_err(|source| BootstrapError::ManifestRead {
        path: path.to_owned(),
        source,
    })?;
    let manifest = parse_manifest(&text).map_err(|source| BootstrapError::InvalidManifest {
        origin: path.to_string(),
        source,
    })?;
    debug!("loaded {} artifacts from {path}", manifest.len());
    Ok(manifest)
}
