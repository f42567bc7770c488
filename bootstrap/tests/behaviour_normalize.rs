//! BDD tests for deriving `app_fixed.py` from `app.py`.

mod support;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::captured;
use tempfile::TempDir;
use trellis_bootstrap::normalize::{derived_path, run_normalize};

const GRADIO_APP: &str = r#"import gradio as gr
import spaces
from typing import *
from trellis.pipelines import TrellisImageTo3DPipeline

with gr.Blocks() as demo:
    image_prompt = gr.Image(label="Image Prompt", type="pil")
    with gr.Row():
        examples = gr.Examples(
            examples=[
                f'assets/example_image/{image}'
                for image in os.listdir("assets/example_image")
            ],
            inputs=[image_prompt],
            fn=lambda x: preprocess(x)
        )

demo.launch()
"#;

struct NormalizeWorld {
    dir: TempDir,
    original: Option<String>,
    fixed: Option<bool>,
    output: String,
}

impl NormalizeWorld {
    fn source(&self) -> Utf8PathBuf {
        Utf8PathBuf::try_from(self.dir.path().join("app.py")).expect("UTF-8 temp dir")
    }

    fn write_source(&mut self, contents: &str) {
        std::fs::write(self.source(), contents).expect("write app.py");
        self.original = Some(contents.to_owned());
    }

    fn fixed_text(&self) -> String {
        std::fs::read_to_string(derived_path(&self.source())).expect("read app_fixed.py")
    }
}

#[fixture]
fn world() -> NormalizeWorld {
    NormalizeWorld {
        dir: tempfile::tempdir().expect("temp dir"),
        original: None,
        fixed: None,
        output: String::new(),
    }
}

#[given("an app.py with the gradio preamble and the examples gallery")]
fn given_gradio_app(world: &mut NormalizeWorld) {
    world.write_source(GRADIO_APP);
}

#[given("an app.py containing \"{text}\"")]
fn given_app_containing(world: &mut NormalizeWorld, text: String) {
    world.write_source(&format!("{text}\n"));
}

#[given("no app.py exists")]
fn given_no_app(world: &mut NormalizeWorld) {
    assert!(!world.source().exists());
}

#[when("the app paths are fixed")]
fn when_fixed(world: &mut NormalizeWorld) {
    let mut stderr = Vec::new();
    world.fixed = Some(run_normalize(&world.source(), &mut stderr));
    world.output = captured(&stderr);
}

#[then("the fix succeeds")]
fn then_fix_succeeds(world: &mut NormalizeWorld) {
    assert_eq!(world.fixed, Some(true), "output:\n{}", world.output);
}

#[then("the fix fails")]
fn then_fix_fails(world: &mut NormalizeWorld) {
    assert_eq!(world.fixed, Some(false));
    assert!(!derived_path(&world.source()).exists());
}

#[then("app_fixed.py defines CURRENT_DIR")]
fn then_defines_current_dir(world: &mut NormalizeWorld) {
    let fixed = world.fixed_text();
    assert!(fixed.contains("CURRENT_DIR = os.path.dirname(os.path.abspath(__file__))"));
    assert!(fixed.contains("sys.path.append(CURRENT_DIR)"));
    assert!(fixed.contains("from trellis.pipelines import TrellisImageTo3DPipeline"));
}

#[then("app_fixed.py lists examples under CURRENT_DIR")]
fn then_examples_anchored(world: &mut NormalizeWorld) {
    let fixed = world.fixed_text();
    assert!(fixed.contains("os.path.join(CURRENT_DIR, 'assets', 'example_image', image)"));
    assert!(!fixed.contains("f'assets/example_image/{image}'"));
    assert!(fixed.ends_with("demo.launch()\n"));
}

#[then("app.py is unchanged")]
fn then_source_unchanged(world: &mut NormalizeWorld) {
    let current = std::fs::read_to_string(world.source()).expect("read app.py");
    assert_eq!(Some(current), world.original);
}

#[then("app_fixed.py is identical to app.py")]
fn then_identical(world: &mut NormalizeWorld) {
    assert_eq!(Some(world.fixed_text()), world.original);
}

#[then("the output contains \"{text}\"")]
fn then_output_contains(world: &mut NormalizeWorld, text: String) {
    assert!(
        world.output.contains(&text),
        "expected output to contain '{text}', got:\n{}",
        world.output
    );
}

#[scenario(path = "tests/features/normalize.feature", name = "Both regions are rewritten")]
fn scenario_both_regions(world: NormalizeWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/normalize.feature",
    name = "A file without either region is copied unchanged"
)]
fn scenario_no_regions(world: NormalizeWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/normalize.feature", name = "A missing app.py is reported")]
fn scenario_missing_source(world: NormalizeWorld) {
    let _ = world;
}
