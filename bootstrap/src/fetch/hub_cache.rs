//! Population of the shared hub cache.
//!
//! A hub variant is a code repository exposing a `hubconf.py` plus the
//! checkpoints its entrypoint loads. Consumers later resolve both from the
//! cache by convention, so this module only has to put the files where the
//! hub loader looks for them:
//!
//! - code under `<hub>/<owner>_<name>_<ref>/`
//! - URL checkpoints under `<hub>/checkpoints/<file name>`
//! - Hugging Face checkpoints under `<hub>/checkpoints/<repo name>/`

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

use super::download::HubClient;
use super::error::FetchError;
use super::extraction::extract_zip_stripping_root;
use super::snapshot::snapshot_repo;
use crate::config::Layout;
use crate::credential::Credential;
use crate::manifest::{CheckpointSource, HubVariant, url_file_name};

/// Name of the module the hub loader imports entrypoints from.
pub const HUBCONF_FILE: &str = "hubconf.py";

/// Place the code and checkpoints of `variant` in the hub cache.
///
/// Returns the directory holding the extracted code. Code already present in
/// the cache is reused without contacting the network; checkpoints already
/// present are skipped.
///
/// # Errors
///
/// Returns a [`FetchError`] if any download or extraction fails or the
/// repository does not define the requested entrypoint.
pub fn load_hub_variant(
    client: &dyn HubClient,
    layout: &Layout,
    variant: &HubVariant,
    credential: &Credential,
) -> Result<Utf8PathBuf, FetchError> {
    let hub_dir = &layout.hub_cache_dir;
    std::fs::create_dir_all(hub_dir).map_err(|e| FetchError::io("create directory", hub_dir, e))?;

    let repo_dir = layout.hub_repo_dir(variant);
    if repo_dir.is_dir() {
        debug!("using cached hub code at {repo_dir}");
    } else {
        install_code(client, hub_dir, &repo_dir, variant)?;
    }
    ensure_entrypoint(&repo_dir, variant)?;

    let checkpoints_dir = layout.checkpoints_dir();
    for checkpoint in variant.checkpoints() {
        fetch_checkpoint(client, &checkpoints_dir, checkpoint, credential)?;
    }

    Ok(repo_dir)
}

/// Download and extract the code archive, renaming it into place only once
/// extraction has completed.
fn install_code(
    client: &dyn HubClient,
    hub_dir: &Utf8Path,
    repo_dir: &Utf8Path,
    variant: &HubVariant,
) -> Result<(), FetchError> {
    let archive = tempfile::Builder::new()
        .prefix(".")
        .suffix(".zip")
        .tempfile_in(hub_dir)
        .map_err(|e| FetchError::io("create temporary file in", hub_dir, e))?;
    client.download_archive(variant.repo(), variant.reference(), archive.path())?;

    let staging = tempfile::Builder::new()
        .prefix(".")
        .tempdir_in(hub_dir)
        .map_err(|e| FetchError::io("create temporary directory in", hub_dir, e))?;
    let files = extract_zip_stripping_root(archive.path(), staging.path())?;
    debug!("extracted {files} files of {}", variant.repo());

    std::fs::rename(staging.path(), repo_dir)
        .map_err(|e| FetchError::io("move into place", repo_dir, e))?;
    Ok(())
}

fn ensure_entrypoint(repo_dir: &Utf8Path, variant: &HubVariant) -> Result<(), FetchError> {
    let hubconf = repo_dir.join(HUBCONF_FILE);
    let missing = || FetchError::MissingEntrypoint {
        entrypoint: variant.entrypoint().to_owned(),
        repo: variant.repo().to_owned(),
    };
    let source = match std::fs::read_to_string(&hubconf) {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing()),
        Err(e) => return Err(FetchError::io("read", hubconf, e)),
    };
    if defines_callable(&source, variant.entrypoint()) {
        Ok(())
    } else {
        Err(missing())
    }
}

/// Return true when `source` binds `name` at module level.
///
/// The hub loader resolves entrypoints by attribute lookup, so a function
/// re-exported through an import counts as much as one defined in place. A
/// star import cannot be resolved here and is accepted.
fn defines_callable(source: &str, name: &str) -> bool {
    top_level_statements(source)
        .iter()
        .flat_map(|statement| bound_names(statement))
        .any(|bound| bound == name || bound == "*")
}

/// Join the module-level statements of `source`, following bracketed and
/// backslash continuations. Comments and indented blocks are dropped.
fn top_level_statements(source: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut pending: Option<String> = None;
    for raw in source.lines() {
        let line = raw.split('#').next().unwrap_or_default().trim_end();
        let statement = match pending.take() {
            Some(mut open) => {
                open.truncate(open.trim_end_matches('\\').len());
                open.push(' ');
                open.push_str(line.trim_start());
                open
            }
            None if line.is_empty() || line.starts_with(char::is_whitespace) => continue,
            None => line.to_owned(),
        };
        if is_continued(&statement) {
            pending = Some(statement);
        } else {
            statements.push(statement);
        }
    }
    statements.extend(pending);
    statements
}

fn is_continued(statement: &str) -> bool {
    let opened = statement.matches(['(', '[', '{']).count();
    let closed = statement.matches([')', ']', '}']).count();
    statement.ends_with('\\') || opened > closed
}

/// Names a single module-level statement binds.
fn bound_names(statement: &str) -> Vec<&str> {
    let definition = statement
        .strip_prefix("def ")
        .or_else(|| statement.strip_prefix("async def "))
        .or_else(|| statement.strip_prefix("class "));
    if let Some(rest) = definition {
        return leading_identifier(rest).into_iter().collect();
    }
    if statement.starts_with("from ") {
        let Some((_, imported)) = statement.split_once(" import ") else {
            return Vec::new();
        };
        let imported = imported.trim().trim_start_matches('(').trim_end_matches(')');
        return imported
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.split_once(" as ").map_or(item, |(_, alias)| alias.trim()))
            .collect();
    }
    if let Some(modules) = statement.strip_prefix("import ") {
        return modules
            .split(',')
            .map(str::trim)
            .filter_map(|item| match item.split_once(" as ") {
                Some((_, alias)) => Some(alias.trim()),
                None => item.split('.').next(),
            })
            .collect();
    }
    assigned_name(statement).into_iter().collect()
}

/// Target of a plain or annotated assignment such as `name = ...`.
fn assigned_name(statement: &str) -> Option<&str> {
    let name = leading_identifier(statement)?;
    let rest = statement[name.len()..].trim_start();
    let value = match rest.strip_prefix(':') {
        Some(annotated) => &annotated[annotated.find('=')?..],
        None => rest,
    };
    (value.starts_with('=') && !value.starts_with("==")).then_some(name)
}

fn leading_identifier(text: &str) -> Option<&str> {
    let end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let identifier = &text[..end];
    identifier
        .chars()
        .next()
        .is_some_and(|first| !first.is_ascii_digit())
        .then_some(identifier)
}

fn fetch_checkpoint(
    client: &dyn HubClient,
    checkpoints_dir: &Utf8Path,
    checkpoint: &CheckpointSource,
    credential: &Credential,
) -> Result<(), FetchError> {
    match checkpoint {
        CheckpointSource::HfRepo(repo_id) => {
            let name = repo_id.rsplit('/').next().unwrap_or(repo_id);
            let summary = snapshot_repo(client, repo_id, &checkpoints_dir.join(name), credential)?;
            debug!(
                "{repo_id}: {} downloaded, {} already present",
                summary.downloaded, summary.skipped
            );
            Ok(())
        }
        CheckpointSource::Url(url) => fetch_url_checkpoint(client, checkpoints_dir, url),
    }
}

fn fetch_url_checkpoint(client: &dyn HubClient, checkpoints_dir: &Utf8Path, url: &str) -> Result<(), FetchError> {
    let file_name = url_file_name(url).ok_or_else(|| FetchError::UnsafePath {
        path: url.to_owned(),
    })?;
    let target = checkpoints_dir.join(file_name);
    if target.is_file() {
        debug!("checkpoint {target} already present");
        return Ok(());
    }

    std::fs::create_dir_all(checkpoints_dir)
        .map_err(|e| FetchError::io("create directory", checkpoints_dir, e))?;
    let partial = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(checkpoints_dir)
        .map_err(|e| FetchError::io("create temporary file in", checkpoints_dir, e))?;
    client.download_url(url, partial.path())?;
    partial
        .persist(&target)
        .map_err(|e| FetchError::io("move into place", target, e.error))?;
    Ok(())
}
