//! Snapshot fetching: mirror every file of a model repository into a local
//! directory.
//!
//! Files are streamed into a hidden temporary file beside their final path
//! and renamed into place only once complete (and, for LFS files, once the
//! SHA-256 matches), so an interrupted run never leaves a truncated file
//! under its real name. A file already present is left untouched when its
//! size matches and, for LFS files, its SHA-256 matches the listing too.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use super::download::{HubClient, RepoFile};
use super::error::FetchError;
use super::verification::{DigestCheck, check_sha256};
use crate::credential::Credential;

/// Revision fetched for every repository.
pub const DEFAULT_REVISION: &str = "main";

/// Counts of files handled by one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Files transferred during this run.
    pub downloaded: usize,
    /// Files already present and matching the listing.
    pub skipped: usize,
}

/// Mirror `repo_id` into `destination`, creating it if needed.
///
/// # Errors
///
/// Returns a [`FetchError`] if the listing fails, the repository is empty,
/// a listed path would escape `destination`, or any file fails to download
/// or verify. Files completed before the failure are kept.
pub fn snapshot_repo(
    client: &dyn HubClient,
    repo_id: &str,
    destination: &Utf8Path,
    credential: &Credential,
) -> Result<SnapshotSummary, FetchError> {
    std::fs::create_dir_all(destination)
        .map_err(|e| FetchError::io("create directory", destination, e))?;

    let files = client.list_repo_files(repo_id, DEFAULT_REVISION, credential)?;
    if files.is_empty() {
        return Err(FetchError::EmptyRepository {
            repo_id: repo_id.to_owned(),
        });
    }
    debug!("{repo_id}: {} files listed", files.len());

    let mut summary = SnapshotSummary::default();
    for file in &files {
        let target = local_path(destination, &file.path)?;
        if is_up_to_date(&target, file) {
            debug!("{repo_id}: {} already present", file.path);
            summary.skipped += 1;
            continue;
        }
        fetch_file(client, repo_id, file, &target, credential)?;
        summary.downloaded += 1;
    }

    Ok(summary)
}

/// Map a repository path onto `destination`, rejecting anything that is not
/// a plain relative path.
fn local_path(destination: &Utf8Path, repo_path: &str) -> Result<Utf8PathBuf, FetchError> {
    let safe = !repo_path.is_empty()
        && !repo_path.starts_with('/')
        && !repo_path.contains('\\')
        && repo_path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if !safe {
        return Err(FetchError::UnsafePath {
            path: repo_path.to_owned(),
        });
    }
    Ok(repo_path
        .split('/')
        .fold(destination.to_owned(), |path, segment| path.join(segment)))
}

/// Whether `target` already holds `file`. A listed digest is checked as
/// well, so a corrupted file of the right size is fetched again.
fn is_up_to_date(target: &Utf8Path, file: &RepoFile) -> bool {
    let same_size =
        std::fs::metadata(target).is_ok_and(|meta| meta.is_file() && meta.len() == file.size);
    same_size
        && file.sha256.as_deref().is_none_or(|expected| {
            matches!(check_sha256(target.as_std_path(), expected), Ok(DigestCheck::Match))
        })
}

fn fetch_file(
    client: &dyn HubClient,
    repo_id: &str,
    file: &RepoFile,
    target: &Utf8Path,
    credential: &Credential,
) -> Result<(), FetchError> {
    let parent = target.parent().unwrap_or(target);
    std::fs::create_dir_all(parent).map_err(|e| FetchError::io("create directory", parent, e))?;

    let partial = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| FetchError::io("create temporary file in", parent, e))?;

    let bytes = client.download_repo_file(
        repo_id,
        DEFAULT_REVISION,
        &file.path,
        credential,
        partial.path(),
    )?;
    debug!("{repo_id}: {} ({bytes} bytes)", file.path);

    if let Some(expected) = &file.sha256 {
        let check =
            check_sha256(partial.path(), expected).map_err(|e| FetchError::io("hash", target, e))?;
        if let DigestCheck::Mismatch(actual) = check {
            return Err(FetchError::ChecksumMismatch {
                path: file.path.clone(),
                expected: expected.clone(),
                actual,
            });
        }
    }

    partial
        .persist(target)
        .map_err(|e| FetchError::io("move into place", target, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::download::MockHubClient;
    use crate::fetch::error::DownloadError;
    use rstest::rstest;
    use std::path::Path;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn repo_file(path: &str, size: u64, sha256: Option<&str>) -> RepoFile {
        RepoFile {
            path: path.to_owned(),
            size,
            sha256: sha256.map(str::to_owned),
        }
    }

    fn writes_hello(
        _repo: &str,
        _revision: &str,
        _path: &str,
        _credential: &Credential,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        std::fs::write(dest, b"hello world")?;
        Ok(11)
    }

    fn temp_destination() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let destination = Utf8Path::from_path(temp_dir.path())
            .expect("UTF-8 temp dir")
            .join("weights")
            .join("A");
        (temp_dir, destination)
    }

    #[test]
    fn downloads_all_listed_files() {
        let (_guard, destination) = temp_destination();
        let mut client = MockHubClient::new();
        client.expect_list_repo_files().times(1).returning(|_, _, _| {
            Ok(vec![
                repo_file("config.json", 11, None),
                repo_file("unet/model.safetensors", 11, Some(HELLO_SHA256)),
            ])
        });
        client
            .expect_download_repo_file()
            .times(2)
            .returning(writes_hello);

        let summary = snapshot_repo(&client, "org/a", &destination, &Credential::absent())
            .expect("snapshot succeeds");

        assert_eq!(summary, SnapshotSummary { downloaded: 2, skipped: 0 });
        assert!(destination.join("config.json").is_file());
        assert!(destination.join("unet").join("model.safetensors").is_file());
    }

    #[test]
    fn existing_files_with_matching_size_are_skipped() {
        let (_guard, destination) = temp_destination();
        std::fs::create_dir_all(&destination).expect("create destination");
        std::fs::write(destination.join("config.json"), b"hello world").expect("seed file");

        let mut client = MockHubClient::new();
        client
            .expect_list_repo_files()
            .returning(|_, _, _| Ok(vec![repo_file("config.json", 11, None)]));
        client.expect_download_repo_file().times(0);

        let summary = snapshot_repo(&client, "org/a", &destination, &Credential::absent())
            .expect("snapshot succeeds");
        assert_eq!(summary, SnapshotSummary { downloaded: 0, skipped: 1 });
    }

    #[rstest]
    #[case::intact(b"hello world", 0)]
    #[case::corrupted(b"hellO world", 1)]
    fn existing_lfs_files_are_checked_against_the_listed_digest(
        #[case] seeded: &[u8],
        #[case] downloads: usize,
    ) {
        let (_guard, destination) = temp_destination();
        std::fs::create_dir_all(&destination).expect("create destination");
        std::fs::write(destination.join("model.bin"), seeded).expect("seed file");

        let mut client = MockHubClient::new();
        client
            .expect_list_repo_files()
            .returning(|_, _, _| Ok(vec![repo_file("model.bin", 11, Some(HELLO_SHA256))]));
        client
            .expect_download_repo_file()
            .times(downloads)
            .returning(writes_hello);

        let summary = snapshot_repo(&client, "org/a", &destination, &Credential::absent())
            .expect("snapshot succeeds");

        assert_eq!(summary.downloaded, downloads);
        let contents = std::fs::read(destination.join("model.bin")).expect("read model");
        assert_eq!(contents, b"hello world");
    }

    #[test]
    fn checksum_mismatch_leaves_no_file_behind() {
        let (_guard, destination) = temp_destination();
        let mut client = MockHubClient::new();
        client
            .expect_list_repo_files()
            .returning(|_, _, _| Ok(vec![repo_file("model.bin", 11, Some("deadbeef"))]));
        client.expect_download_repo_file().returning(writes_hello);

        let err = snapshot_repo(&client, "org/a", &destination, &Credential::absent())
            .expect_err("checksum mismatch");

        assert!(matches!(err, FetchError::ChecksumMismatch { .. }), "{err}");
        let leftovers: Vec<_> = std::fs::read_dir(&destination)
            .expect("destination exists")
            .collect();
        assert!(leftovers.is_empty(), "partial files were left behind");
    }

    #[test]
    fn empty_repository_is_a_failure() {
        let (_guard, destination) = temp_destination();
        let mut client = MockHubClient::new();
        client.expect_list_repo_files().returning(|_, _, _| Ok(Vec::new()));

        let err = snapshot_repo(&client, "org/a", &destination, &Credential::absent())
            .expect_err("empty repository");
        assert!(matches!(err, FetchError::EmptyRepository { .. }));
    }

    #[test]
    fn listing_failure_propagates_as_download_error() {
        let (_guard, destination) = temp_destination();
        let mut client = MockHubClient::new();
        client.expect_list_repo_files().returning(|_, _, _| {
            Err(DownloadError::NotFound {
                url: "https://huggingface.co/api/models/org/a/tree/main".to_owned(),
            })
        });

        let err = snapshot_repo(&client, "org/a", &destination, &Credential::absent())
            .expect_err("missing repository");
        assert!(err.suggests_credential());
    }

    #[test]
    fn credential_is_passed_to_every_request() {
        let (_guard, destination) = temp_destination();
        let mut client = MockHubClient::new();
        client
            .expect_list_repo_files()
            .withf(|_, _, credential| credential.token() == Some("hf_token"))
            .returning(|_, _, _| Ok(vec![repo_file("config.json", 11, None)]));
        client
            .expect_download_repo_file()
            .withf(|_, _, _, credential, _| credential.token() == Some("hf_token"))
            .returning(writes_hello);

        snapshot_repo(&client, "org/a", &destination, &Credential::new("hf_token"))
            .expect("snapshot succeeds");
    }

    #[rstest]
    #[case::parent("../escape")]
    #[case::nested_parent("a/../../escape")]
    #[case::absolute("/etc/passwd")]
    #[case::empty("")]
    #[case::backslash("a\\..\\b")]
    fn unsafe_repository_paths_are_rejected(#[case] path: &str) {
        let err = local_path(Utf8Path::new("/weights/A"), path).expect_err("unsafe path");
        assert!(matches!(err, FetchError::UnsafePath { .. }));
    }

    #[test]
    fn nested_repository_path_maps_under_destination() {
        let path = local_path(Utf8Path::new("/weights/A"), "unet/config.json").expect("safe path");
        assert_eq!(path, Utf8PathBuf::from("/weights/A/unet/config.json"));
    }
}
