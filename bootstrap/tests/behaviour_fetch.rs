//! BDD tests for the download pipeline against an in-memory hub.
//!
//! Every scenario runs the real snapshot and hub cache strategies over a
//! [`StubHubClient`], writing into a temporary directory layout.

mod support;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::{TempLayout, captured, temp_layout};
use trellis_bootstrap::credential::Credential;
use trellis_bootstrap::fetch::{FetchContext, HubArtifactSource};
use trellis_bootstrap::manifest::{ArtifactRequest, Manifest, Variant};
use trellis_bootstrap::orchestrator::{acquire_all, ensure_weights_dir};
use trellis_bootstrap::output::write_completion;
use trellis_bootstrap::test_utils::{StubHubClient, code_archive};

const TEST_TOKEN: &str = "hf_test_token";

struct FetchWorld {
    temp: TempLayout,
    client: StubHubClient,
    requests: Vec<ArtifactRequest>,
    builtin: bool,
    token: Option<String>,
    output: String,
    client_requests: Vec<String>,
}

#[fixture]
fn world() -> FetchWorld {
    FetchWorld {
        temp: temp_layout(),
        client: StubHubClient::new(),
        requests: Vec::new(),
        builtin: false,
        token: None,
        output: String::new(),
        client_requests: Vec::new(),
    }
}

fn file_contents(file: &str) -> String {
    format!("contents of {file}\n")
}

fn run_pipeline(world: &mut FetchWorld, runs: usize) {
    let manifest = if world.builtin {
        Manifest::builtin().expect("built-in manifest parses")
    } else {
        Manifest::new(world.requests.clone()).expect("valid manifest")
    };
    let credential = world
        .token
        .as_deref()
        .map_or_else(Credential::absent, Credential::new);
    let context = FetchContext {
        credential: &credential,
        quiet: false,
    };
    let layout = world.temp.layout.clone();
    let client = std::mem::take(&mut world.client);
    let source = HubArtifactSource::new(&client, layout.clone());

    let mut stderr = Vec::new();
    for _ in 0..runs {
        ensure_weights_dir(&layout.weights_dir, &mut stderr);
        let report = acquire_all(&manifest, &source, &layout, context, &mut stderr);
        write_completion(&report, &mut stderr);
    }

    world.client_requests = client.requests();
    world.output = captured(&stderr);
}

#[given("a public repository \"{repo}\" serving \"{file}\"")]
fn given_public_repo(world: &mut FetchWorld, repo: String, file: String) {
    let contents = file_contents(&file);
    let client = std::mem::take(&mut world.client);
    world.client = client.with_repo(&repo, &[(file.as_str(), contents.as_str())]);
}

#[given("a private repository \"{repo}\" serving \"{file}\"")]
fn given_private_repo(world: &mut FetchWorld, repo: String, file: String) {
    let contents = file_contents(&file);
    let client = std::mem::take(&mut world.client);
    world.client = client.with_private_repo(&repo, TEST_TOKEN, &[(file.as_str(), contents.as_str())]);
}

#[given("the manifest requests \"{name}\" from \"{repo}\"")]
fn given_manifest_request(world: &mut FetchWorld, name: String, repo: String) {
    let variant = Variant::snapshot(repo).expect("valid repository");
    world
        .requests
        .push(ArtifactRequest::new(name, vec![variant]).expect("valid request"));
}

#[given("the Hugging Face token is \"{token}\"")]
fn given_token(world: &mut FetchWorld, token: String) {
    world.token = Some(token);
}

#[given("the hub code \"{repo}\" defines \"{entrypoint}\"")]
fn given_hub_code(world: &mut FetchWorld, repo: String, entrypoint: String) {
    let name = repo.rsplit('/').next().unwrap_or(&repo);
    let hubconf = format!("dependencies = ['torch']\n\ndef {entrypoint}(**kwargs):\n    pass\n");
    let archive = code_archive(&format!("{name}-main"), &[("hubconf.py", hubconf.as_str())]);
    let client = std::mem::take(&mut world.client);
    world.client = client.with_archive(&repo, "main", archive);
}

#[given("the built-in manifest")]
fn given_builtin_manifest(world: &mut FetchWorld) {
    world.builtin = true;
}

#[when("the download pipeline runs")]
fn when_pipeline_runs(world: &mut FetchWorld) {
    run_pipeline(world, 1);
}

#[when("the download pipeline runs twice")]
fn when_pipeline_runs_twice(world: &mut FetchWorld) {
    run_pipeline(world, 2);
}

#[then("the weights directory contains \"{path}\"")]
fn then_weights_contain(world: &mut FetchWorld, path: String) {
    let target = world.temp.layout.weights_dir.join(&path);
    assert!(target.is_file(), "expected {target} to exist");
}

#[then("the hub cache contains \"{path}\"")]
fn then_hub_cache_contains(world: &mut FetchWorld, path: String) {
    let target = world.temp.layout.hub_cache_dir.join(&path);
    assert!(target.is_file(), "expected {target} to exist");
}

#[then("the output contains \"{text}\"")]
fn then_output_contains(world: &mut FetchWorld, text: String) {
    assert!(
        world.output.contains(&text),
        "expected output to contain '{text}', got:\n{}",
        world.output
    );
}

#[then("\"{path}\" was downloaded once")]
fn then_downloaded_once(world: &mut FetchWorld, path: String) {
    let request = format!("get {path}");
    let count = world
        .client_requests
        .iter()
        .filter(|recorded| **recorded == request)
        .count();
    assert_eq!(count, 1, "requests: {:?}", world.client_requests);
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "Public snapshot downloads without a token"
)]
fn scenario_public_snapshot(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "Private snapshot without a token reports the hint"
)]
fn scenario_private_without_token(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "Private snapshot with a token succeeds"
)]
fn scenario_private_with_token(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "Re-running into a populated destination succeeds"
)]
fn scenario_rerun(world: FetchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/fetch.feature",
    name = "Hub variant falls back to the second checkpoint"
)]
fn scenario_hub_fallback(world: FetchWorld) {
    let _ = world;
}
