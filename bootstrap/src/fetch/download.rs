//! HTTP access to the model hub and to hub code archives.
//!
//! Provides a trait-based abstraction over the few HTTP calls the fetchers
//! make, so strategy logic can be tested without network access.

use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use super::error::DownloadError;
use crate::config::Endpoints;
use crate::credential::Credential;

/// Connect timeout for hub requests. Transfers themselves are unbounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One file in a repository listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Published SHA-256 for LFS-tracked files.
    pub sha256: Option<String>,
}

/// Trait for the HTTP operations used by the fetchers.
///
/// # Examples
///
/// ```
/// use trellis_bootstrap::config::Endpoints;
/// use trellis_bootstrap::fetch::download::HttpHubClient;
///
/// let client = HttpHubClient::new(Endpoints::default());
/// assert_eq!(
///     client.resolve_url("ZhengPeng7/BiRefNet", "main", "config.json"),
///     "https://huggingface.co/ZhengPeng7/BiRefNet/resolve/main/config.json"
/// );
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait HubClient {
    /// List every file of `repo_id` at `revision`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing is malformed.
    fn list_repo_files(
        &self,
        repo_id: &str,
        revision: &str,
        credential: &Credential,
    ) -> Result<Vec<RepoFile>, DownloadError>;

    /// Download one repository file into `dest`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or the file write fails.
    fn download_repo_file(
        &self,
        repo_id: &str,
        revision: &str,
        path: &str,
        credential: &Credential,
        dest: &Path,
    ) -> Result<u64, DownloadError>;

    /// Download the zip archive of a code repository branch into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or the file write fails.
    fn download_archive(&self, repo: &str, reference: &str, dest: &Path) -> Result<u64, DownloadError>;

    /// Download an arbitrary public URL into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or the file write fails.
    fn download_url(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}

impl<T: HubClient + ?Sized> HubClient for &T {
    fn list_repo_files(
        &self,
        repo_id: &str,
        revision: &str,
        credential: &Credential,
    ) -> Result<Vec<RepoFile>, DownloadError> {
        (**self).list_repo_files(repo_id, revision, credential)
    }

    fn download_repo_file(
        &self,
        repo_id: &str,
        revision: &str,
        path: &str,
        credential: &Credential,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        (**self).download_repo_file(repo_id, revision, path, credential, dest)
    }

    fn download_archive(&self, repo: &str, reference: &str, dest: &Path) -> Result<u64, DownloadError> {
        (**self).download_archive(repo, reference, dest)
    }

    fn download_url(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        (**self).download_url(url, dest)
    }
}

/// HTTP hub client using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpHubClient {
    endpoints: Endpoints,
}

impl HttpHubClient {
    /// Create a client for the given endpoints.
    #[must_use]
    pub const fn new(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }

    /// URL of the recursive file listing for a repository revision.
    #[must_use]
    pub fn tree_url(&self, repo_id: &str, revision: &str) -> String {
        format!(
            "{}/api/models/{}/tree/{}?recursive=true",
            self.endpoints.huggingface,
            encode_path(repo_id),
            urlencoding::encode(revision)
        )
    }

    /// URL of a single repository file.
    ///
    /// Each `/`-separated segment of `path` is percent-encoded, so names with
    /// spaces, `#` or non-ASCII characters address the file itself.
    #[must_use]
    pub fn resolve_url(&self, repo_id: &str, revision: &str, path: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.endpoints.huggingface,
            encode_path(repo_id),
            urlencoding::encode(revision),
            encode_path(path)
        )
    }

    /// URL of a code repository branch archive.
    #[must_use]
    pub fn archive_url(&self, repo: &str, reference: &str) -> String {
        format!(
            "{}/{repo}/archive/refs/heads/{reference}.zip",
            self.endpoints.github
        )
    }
}

impl HubClient for HttpHubClient {
    fn list_repo_files(
        &self,
        repo_id: &str,
        revision: &str,
        credential: &Credential,
    ) -> Result<Vec<RepoFile>, DownloadError> {
        let mut files = Vec::new();
        let mut next = Some(self.tree_url(repo_id, revision));

        while let Some(url) = next.take() {
            let response = get(&url, credential)?;
            next = response
                .headers()
                .get("link")
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url);
            let body = response
                .into_body()
                .read_to_string()
                .map_err(|e| DownloadError::HttpError {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            files.extend(parse_tree_listing(&url, &body)?);
        }

        Ok(files)
    }

    fn download_repo_file(
        &self,
        repo_id: &str,
        revision: &str,
        path: &str,
        credential: &Credential,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        let url = self.resolve_url(repo_id, revision, path);
        download_to_file(&url, credential, dest)
    }

    fn download_archive(&self, repo: &str, reference: &str, dest: &Path) -> Result<u64, DownloadError> {
        let url = self.archive_url(repo, reference);
        download_to_file(&url, &Credential::absent(), dest)
    }

    fn download_url(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        download_to_file(url, &Credential::absent(), dest)
    }
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    lfs: Option<LfsPointer>,
}

#[derive(Debug, Deserialize)]
struct LfsPointer {
    oid: String,
}

/// Parse a tree listing body, keeping files and dropping directories.
/// Percent-encode every segment of a `/`-separated path, keeping the
/// separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_tree_listing(url: &str, body: &str) -> Result<Vec<RepoFile>, DownloadError> {
    let entries: Vec<TreeEntry> =
        serde_json::from_str(body).map_err(|e| DownloadError::InvalidResponse {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(entries
        .into_iter()
        .filter(|entry| entry.kind == "file")
        .map(|entry| RepoFile {
            path: entry.path,
            size: entry.size,
            sha256: entry.lfs.map(|lfs| lfs.oid),
        })
        .collect())
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().replace(' ', "") == "rel=\"next\"");
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| target.to_owned())
    })
}

fn get(url: &str, credential: &Credential) -> Result<ureq::http::Response<ureq::Body>, DownloadError> {
    let mut request = http_agent().get(url);
    if let Some(header) = credential.bearer_header() {
        request = request.header("Authorization", header);
    }
    request.call().map_err(|e| map_ureq_error(url, &e))
}

/// Download a URL and write the body to a file.
fn download_to_file(url: &str, credential: &Credential, dest: &Path) -> Result<u64, DownloadError> {
    let response = get(url, credential)?;
    let mut file = std::fs::File::create(dest)?;
    let written = std::io::copy(&mut response.into_body().as_reader(), &mut file)?;
    file.sync_all()?;
    Ok(written)
}

/// Shared `ureq` agent with connect timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .user_agent(concat!("trellis-bootstrap/", env!("CARGO_PKG_VERSION")))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(status @ (401 | 403)) => DownloadError::Unauthorized {
            url: url.to_owned(),
            status: *status,
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
