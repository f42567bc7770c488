//! Shared test utilities for the bootstrap crate.

use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use crate::credential::Credential;
use crate::fetch::download::{HubClient, RepoFile};
use crate::fetch::error::{DownloadError, FetchError};
use crate::fetch::fetcher::ArtifactSource;
use crate::manifest::{HubVariant, Variant};

/// Build a zip archive whose entries sit under `root/`, as branch archives do.
///
/// # Panics
///
/// Panics if the archive cannot be built in memory.
pub fn code_archive(root: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in files {
        writer
            .start_file(format!("{root}/{name}"), options)
            .expect("start archive entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write archive entry");
    }
    writer.finish().expect("finish archive").into_inner()
}

/// An in-memory [`HubClient`].
///
/// Repositories marked private answer 401 unless the request carries the
/// expected token. Unknown repositories, archives and URLs answer 404.
#[derive(Debug, Default)]
pub struct StubHubClient {
    repos: BTreeMap<String, Vec<(String, Vec<u8>)>>,
    private: BTreeMap<String, String>,
    archives: BTreeMap<String, Vec<u8>>,
    urls: BTreeMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StubHubClient {
    /// Create an empty stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a public model repository.
    pub fn with_repo(mut self, repo_id: &str, files: &[(&str, &str)]) -> Self {
        let files = files
            .iter()
            .map(|(path, contents)| ((*path).to_owned(), contents.as_bytes().to_vec()))
            .collect();
        self.repos.insert(repo_id.to_owned(), files);
        self
    }

    /// Serve a repository that requires `token`.
    pub fn with_private_repo(self, repo_id: &str, token: &str, files: &[(&str, &str)]) -> Self {
        let mut stub = self.with_repo(repo_id, files);
        stub.private.insert(repo_id.to_owned(), token.to_owned());
        stub
    }

    /// Serve a code archive for `repo` at branch `reference`.
    pub fn with_archive(mut self, repo: &str, reference: &str, archive: Vec<u8>) -> Self {
        self.archives.insert(format!("{repo}@{reference}"), archive);
        self
    }

    /// Serve `contents` at `url`.
    pub fn with_url(mut self, url: &str, contents: &str) -> Self {
        self.urls.insert(url.to_owned(), contents.as_bytes().to_vec());
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    fn record(&self, request: String) {
        self.requests.borrow_mut().push(request);
    }

    fn repo(&self, repo_id: &str, credential: &Credential) -> Result<&[(String, Vec<u8>)], DownloadError> {
        let url = format!("stub://{repo_id}");
        if let Some(token) = self.private.get(repo_id) {
            if credential.token() != Some(token.as_str()) {
                return Err(DownloadError::Unauthorized { url, status: 401 });
            }
        }
        self.repos
            .get(repo_id)
            .map(Vec::as_slice)
            .ok_or(DownloadError::NotFound { url })
    }
}

fn write_bytes(dest: &Path, bytes: &[u8]) -> Result<u64, DownloadError> {
    std::fs::write(dest, bytes)?;
    Ok(bytes.len() as u64)
}

impl HubClient for StubHubClient {
    fn list_repo_files(
        &self,
        repo_id: &str,
        _revision: &str,
        credential: &Credential,
    ) -> Result<Vec<RepoFile>, DownloadError> {
        self.record(format!("list {repo_id}"));
        Ok(self
            .repo(repo_id, credential)?
            .iter()
            .map(|(path, bytes)| RepoFile {
                path: path.clone(),
                size: bytes.len() as u64,
                sha256: None,
            })
            .collect())
    }

    fn download_repo_file(
        &self,
        repo_id: &str,
        _revision: &str,
        path: &str,
        credential: &Credential,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        self.record(format!("get {repo_id}/{path}"));
        let (_, bytes) = self
            .repo(repo_id, credential)?
            .iter()
            .find(|(file, _)| file == path)
            .ok_or_else(|| DownloadError::NotFound {
                url: format!("stub://{repo_id}/{path}"),
            })?;
        write_bytes(dest, bytes)
    }

    fn download_archive(&self, repo: &str, reference: &str, dest: &Path) -> Result<u64, DownloadError> {
        let key = format!("{repo}@{reference}");
        self.record(format!("archive {key}"));
        let bytes = self
            .archives
            .get(&key)
            .ok_or(DownloadError::NotFound { url: key.clone() })?;
        write_bytes(dest, bytes)
    }

    fn download_url(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        self.record(format!("url {url}"));
        let bytes = self.urls.get(url).ok_or_else(|| DownloadError::NotFound {
            url: url.to_owned(),
        })?;
        write_bytes(dest, bytes)
    }
}

/// An [`ArtifactSource`] that records attempts and fails on request.
///
/// Every variant succeeds unless its identifier was marked as failing.
#[derive(Debug, Default)]
pub struct RecordingSource {
    failing: BTreeSet<String>,
    attempts: RefCell<Vec<String>>,
    credentials: RefCell<Vec<bool>>,
}

impl RecordingSource {
    /// Create a source on which every variant succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the variant with `identifier` fail with a not-found error.
    pub fn failing(mut self, identifier: &str) -> Self {
        self.failing.insert(identifier.to_owned());
        self
    }

    /// Identifiers attempted so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.borrow().clone()
    }

    /// Whether a token was present on each attempt, in order.
    pub fn credential_presence(&self) -> Vec<bool> {
        self.credentials.borrow().clone()
    }

    fn attempt(
        &self,
        identifier: String,
        credential: &Credential,
        location: Utf8PathBuf,
    ) -> Result<Utf8PathBuf, FetchError> {
        self.credentials.borrow_mut().push(credential.is_present());
        let failed = self.failing.contains(&identifier);
        self.attempts.borrow_mut().push(identifier.clone());
        if failed {
            return Err(FetchError::Download(DownloadError::NotFound {
                url: format!("stub://{identifier}"),
            }));
        }
        Ok(location)
    }
}

impl ArtifactSource for RecordingSource {
    fn snapshot(
        &self,
        repo_id: &str,
        destination: &Utf8Path,
        credential: &Credential,
    ) -> Result<Utf8PathBuf, FetchError> {
        self.attempt(repo_id.to_owned(), credential, destination.to_owned())
    }

    fn hub(&self, variant: &HubVariant, credential: &Credential) -> Result<Utf8PathBuf, FetchError> {
        let identifier = Variant::Hub(variant.clone()).identifier();
        self.attempt(
            identifier,
            credential,
            Utf8PathBuf::from("hub").join(variant.cache_dir_name()),
        )
    }
}
