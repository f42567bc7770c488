//! Model weight download CLI entrypoint.
//!
//! Resolves the directory layout, loads `.env` and the manifest, then walks
//! every artifact through its fallback cascade. Setup problems exit with
//! status 1; once downloading starts the process always exits 0 and
//! failures are reported on stderr.

use clap::Parser;
use std::io::Write;
use trellis_bootstrap::cli::DownloadCli;
use trellis_bootstrap::config::{Endpoints, Layout, load_env_file, load_manifest, resolve_layout};
use trellis_bootstrap::credential::resolve_credential;
use trellis_bootstrap::dirs::SystemBaseDirs;
use trellis_bootstrap::error::Result;
use trellis_bootstrap::fetch::{FetchContext, HttpHubClient, HubArtifactSource};
use trellis_bootstrap::manifest::Manifest;
use trellis_bootstrap::orchestrator::{acquire_all, ensure_weights_dir};
use trellis_bootstrap::output::{DryRunInfo, write_completion, write_stderr_line};

fn main() {
    let cli = DownloadCli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &DownloadCli, stderr: &mut dyn Write) -> Result<()> {
    let dirs = SystemBaseDirs;
    let executable = std::env::current_exe().ok();
    let layout = resolve_layout(
        cli.project_root.as_deref(),
        cli.weights_dir.as_deref(),
        executable.as_deref(),
        &dirs,
    )?;
    load_environment(&layout, stderr);
    let manifest = load_manifest(cli.manifest.as_deref())?;
    let endpoints = Endpoints::from_env();
    let credential = resolve_credential(stderr);

    if cli.dry_run {
        print_dry_run_info(&layout, &endpoints, credential.is_present(), &manifest, stderr);
        return Ok(());
    }

    ensure_weights_dir(&layout.weights_dir, stderr);
    let source = HubArtifactSource::new(HttpHubClient::new(endpoints), layout.clone());
    let context = FetchContext {
        credential: &credential,
        quiet: cli.quiet,
    };
    let report = acquire_all(&manifest, &source, &layout, context, stderr);
    write_completion(&report, stderr);
    Ok(())
}

/// Load `.env`, reporting a malformed file without stopping the run.
fn load_environment(layout: &Layout, stderr: &mut dyn Write) {
    if let Err(err) = load_env_file(&layout.project_root) {
        write_stderr_line(stderr, format!("Warning: {err}"));
    }
}

fn print_dry_run_info(
    layout: &Layout,
    endpoints: &Endpoints,
    token_present: bool,
    manifest: &Manifest,
    stderr: &mut dyn Write,
) {
    let info = DryRunInfo {
        weights_dir: &layout.weights_dir,
        hub_cache_dir: &layout.hub_cache_dir,
        endpoint: &endpoints.huggingface,
        token_present,
        manifest,
    };
    write_stderr_line(stderr, info.display_text());
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::{Utf8Path, Utf8PathBuf};
    use trellis_bootstrap::error::BootstrapError;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = BootstrapError::ManifestRead {
            path: Utf8PathBuf::from("/srv/weights.toml"),
            source: std::io::Error::other("permission denied"),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("failed to read manifest /srv/weights.toml"));
    }

    #[test]
    fn malformed_env_file_is_a_warning() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp_dir.path()).expect("UTF-8 temp dir");
        std::fs::write(root.join(".env"), "NOT VALID LINE\n").expect("write env file");
        let layout = Layout {
            project_root: root.to_owned(),
            weights_dir: root.join("weights"),
            hub_cache_dir: root.join("hub"),
        };

        let mut stderr = Vec::new();
        load_environment(&layout, &mut stderr);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("Warning: failed to load environment file"));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp_dir.path()).expect("UTF-8 temp dir");
        let layout = Layout {
            project_root: root.to_owned(),
            weights_dir: root.join("weights"),
            hub_cache_dir: root.join("hub"),
        };
        let manifest = Manifest::builtin().expect("built-in manifest parses");

        let mut stderr = Vec::new();
        print_dry_run_info(&layout, &Endpoints::default(), false, &manifest, &mut stderr);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("Token: absent"));
        assert!(stderr_text.contains("StableNormal"));
        assert!(!layout.weights_dir.exists());
        assert!(!layout.hub_cache_dir.exists());
    }
}
